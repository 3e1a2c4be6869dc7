//! Sparse, bi-infinite single-track tape.

use crate::types::{Direction, Symbol};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Longest run of blanks that [`Tape`]'s `Display` spells out cell by cell.
pub const BLANK_RUN_LIMIT: i128 = 8;

/// A tape of [`Symbol`]s indexed by signed position, with a read/write head.
///
/// Only non-blank cells are stored; any position that was never written (or was last written
/// with [`Symbol::Blank`]) reads as blank. The head can travel arbitrarily far in either
/// direction without any allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tape {
    cells: BTreeMap<i64, Symbol>,
    head: i64,
}

impl Tape {
    /// Creates an empty tape with the head at position 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tape from an ordered sequence of `(position, symbol)` writes and a head position.
    /// Later writes to the same position win.
    pub fn from_cells<I>(cells: I, head: i64) -> Self
    where
        I: IntoIterator<Item = (i64, Symbol)>,
    {
        let mut tape = Self {
            cells: BTreeMap::new(),
            head,
        };
        for (position, symbol) in cells {
            tape.write_at(position, symbol);
        }
        tape
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> Symbol {
        self.read_at(self.head)
    }

    /// Returns the symbol at an arbitrary position.
    pub fn read_at(&self, position: i64) -> Symbol {
        self.cells.get(&position).copied().unwrap_or_default()
    }

    /// Writes a symbol under the head.
    pub fn write(&mut self, symbol: Symbol) {
        self.write_at(self.head, symbol);
    }

    pub(crate) fn write_at(&mut self, position: i64, symbol: Symbol) {
        match symbol {
            Symbol::Blank => {
                self.cells.remove(&position);
            }
            _ => {
                self.cells.insert(position, symbol);
            }
        }
    }

    /// Moves the head one cell in the given direction. `Stay` leaves it in place.
    ///
    /// The head stops at `i64::MIN` and `i64::MAX`; moving past either end leaves it there.
    pub fn move_head(&mut self, direction: Direction) {
        self.head = self.head.saturating_add(direction.offset());
    }

    /// Returns the current head position.
    pub fn position(&self) -> i64 {
        self.head
    }

    /// Places the head at an absolute position.
    pub fn set_position(&mut self, position: i64) {
        self.head = position;
    }

    /// Returns the symbols in the inclusive range `lo..=hi`. An empty range yields an empty vector.
    ///
    /// The result holds one entry per position, so callers pick the range size.
    pub fn snapshot_window(&self, lo: i64, hi: i64) -> Vec<Symbol> {
        if lo > hi {
            return Vec::new();
        }
        (lo..=hi).map(|position| self.read_at(position)).collect()
    }

    /// Resets every cell to blank and returns the head to position 0.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.head = 0;
    }

    /// Returns the lowest and highest non-blank positions, or `None` if the tape is blank.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        let (&lo, _) = self.cells.first_key_value()?;
        let (&hi, _) = self.cells.last_key_value()?;
        Some((lo, hi))
    }

    /// Iterates over the non-blank cells in position order.
    pub fn cells(&self) -> impl Iterator<Item = (i64, Symbol)> + '_ {
        self.cells.iter().map(|(&position, &symbol)| (position, symbol))
    }

    /// Returns `true` if no cell holds a non-blank symbol.
    pub fn is_blank(&self) -> bool {
        self.cells.is_empty()
    }
}

impl fmt::Display for Tape {
    /// Renders the span that covers every non-blank cell and the head.
    ///
    /// Runs of more than [`BLANK_RUN_LIMIT`] blanks between two rendered cells are collapsed to
    /// `(b*n)`, so the output grows with the number of stored cells and not with their distance.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut positions: BTreeSet<i64> = self.cells.keys().copied().collect();
        positions.insert(self.head);

        let mut previous: Option<i64> = None;
        for position in positions {
            if let Some(previous) = previous {
                let gap = i128::from(position) - i128::from(previous) - 1;
                if gap > BLANK_RUN_LIMIT {
                    write!(f, "({}*{gap})", Symbol::Blank)?;
                } else {
                    for _ in 0..gap {
                        write!(f, "{}", Symbol::Blank)?;
                    }
                }
            }
            write!(f, "{}", self.read_at(position))?;
            previous = Some(position);
        }
        Ok(())
    }
}
