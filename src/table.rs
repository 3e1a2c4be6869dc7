//! This module defines the `TransitionTable`, the validated mapping from a control state and the
//! symbol under the head to the [`Transition`] that the machine applies.

use crate::types::{Direction, MachineError, State, Symbol, Transition, HALT_STATE};
use std::collections::{BTreeSet, HashMap};

/// An untyped table row, as produced by a loader before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub state: State,
    pub read: char,
    pub write: char,
    pub direction: char,
    pub next_state: State,
}

/// A validated, immutable transition table.
///
/// Construction checks every key once; afterwards [`TransitionTable::lookup`] is total and never
/// fails. A missing entry is a valid outcome and means the machine halts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTable {
    entries: HashMap<(State, Symbol), Transition>,
}

impl TransitionTable {
    /// Builds a table from typed entries.
    ///
    /// # Errors
    ///
    /// * `MachineError::MalformedTable` if a key uses the halt sentinel as its state, or if the
    ///   same `(state, symbol)` key appears twice.
    pub fn new<I>(entries: I) -> Result<Self, MachineError>
    where
        I: IntoIterator<Item = ((State, Symbol), Transition)>,
    {
        let mut table = HashMap::new();

        for ((state, symbol), transition) in entries {
            if state == HALT_STATE {
                return Err(MachineError::MalformedTable(format!(
                    "state {HALT_STATE} is reserved and cannot have rules (read {symbol})"
                )));
            }

            if table.insert((state, symbol), transition).is_some() {
                return Err(MachineError::MalformedTable(format!(
                    "duplicate entry for state {state} reading {symbol}"
                )));
            }
        }

        Ok(Self { entries: table })
    }

    /// Builds a table from untyped rows, validating every symbol and direction character.
    ///
    /// # Errors
    ///
    /// * `MachineError::MalformedTable` on an unknown symbol or direction, and on every
    ///   condition rejected by [`TransitionTable::new`].
    pub fn from_raw<I>(rows: I) -> Result<Self, MachineError>
    where
        I: IntoIterator<Item = RawEntry>,
    {
        let entries = rows
            .into_iter()
            .map(|row| {
                let read = parse_symbol(row.state, row.read)?;
                let write = parse_symbol(row.state, row.write)?;
                let direction = Direction::try_from(row.direction).map_err(|c| {
                    MachineError::MalformedTable(format!(
                        "invalid direction '{c}' in state {}",
                        row.state
                    ))
                })?;

                Ok((
                    (row.state, read),
                    Transition::new(write, direction, row.next_state),
                ))
            })
            .collect::<Result<Vec<_>, MachineError>>()?;

        Self::new(entries)
    }

    /// Returns the transition for `(state, symbol)`, or `None` when the machine should halt.
    pub fn lookup(&self, state: State, symbol: Symbol) -> Option<Transition> {
        self.entries.get(&(state, symbol)).copied()
    }

    /// Returns the states that have at least one entry, in ascending order.
    pub fn states(&self) -> BTreeSet<State> {
        self.entries.keys().map(|&(state, _)| state).collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = ((State, Symbol), Transition)> + '_ {
        self.entries.iter().map(|(&key, &transition)| (key, transition))
    }
}

fn parse_symbol(state: State, c: char) -> Result<Symbol, MachineError> {
    Symbol::try_from(c).map_err(|c| {
        MachineError::MalformedTable(format!("invalid symbol '{c}' in state {state}"))
    })
}
