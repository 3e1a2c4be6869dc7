//! This module defines the core data structures and types used throughout the tape machine
//! interpreter: the tape alphabet, head movements, control states, transitions and error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::machine::{Machine, MachineConfig};
use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::Rule;

/// A control state identifier. States are 1-based in practice.
pub type State = u32;

/// The "no further transition" sentinel. It may be used as a next state but never as a table key.
pub const HALT_STATE: State = 0;
/// The state a program starts in when it does not name one.
pub const DEFAULT_START_STATE: State = 1;
/// The maximum allowed size for a program in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB
/// The default number of steps `run` is allowed to take.
pub const MAX_EXECUTION_STEPS: i64 = 10000;
/// Half-width of the cell window a renderer shows around position 0.
pub const RENDER_WINDOW: i64 = 14;

/// The tape alphabet. Every cell holds exactly one of these.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    #[default]
    Blank,
    Zero,
    One,
}

impl Symbol {
    /// All symbols in table order.
    pub const ALL: [Symbol; 3] = [Symbol::Blank, Symbol::Zero, Symbol::One];

    /// Returns the canonical character of the symbol.
    pub fn as_char(self) -> char {
        match self {
            Symbol::Blank => 'b',
            Symbol::Zero => '0',
            Symbol::One => '1',
        }
    }
}

impl TryFrom<char> for Symbol {
    type Error = char;

    /// Accepts `b` or `_` for blank, `0` and `1`. The rejected character is returned as the error.
    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'b' | '_' => Ok(Symbol::Blank),
            '0' => Ok(Symbol::Zero),
            '1' => Ok(Symbol::One),
            other => Err(other),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Represents the possible directions the head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Signed offset applied to the head position.
    pub fn offset(self) -> i64 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

impl TryFrom<char> for Direction {
    type Error = char;

    /// Supports '<' or 'L' for Left, '>' or 'R' for Right, and '-' or 'S' for Stay.
    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '<' | 'L' => Ok(Direction::Left),
            '>' | 'R' => Ok(Direction::Right),
            '-' | 'S' => Ok(Direction::Stay),
            other => Err(other),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Direction::Left => '<',
            Direction::Right => '>',
            Direction::Stay => '-',
        };
        write!(f, "{c}")
    }
}

/// The right-hand side of a table entry: what to write, where to move and which state comes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    /// The symbol written under the head.
    pub write: Symbol,
    /// The direction the head moves after writing.
    pub direction: Direction,
    /// The next control state.
    pub next_state: State,
}

impl Transition {
    pub fn new(write: Symbol, direction: Direction, next_state: State) -> Self {
        Self {
            write,
            direction,
            next_state,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.write, self.direction, self.next_state)
    }
}

/// A loaded program: a validated table plus everything needed to start a machine on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The name of the program.
    pub name: String,
    /// The control state of the first step.
    pub initial_state: State,
    /// The initial head position.
    pub head: i64,
    /// The initial tape content as ordered `(position, symbol)` writes.
    pub tape: Vec<(i64, Symbol)>,
    /// The transition table, shared by every machine created from this program.
    pub table: Arc<TransitionTable>,
}

impl Program {
    /// Builds the initial tape.
    pub fn initial_tape(&self) -> Tape {
        Tape::from_cells(self.tape.iter().copied(), self.head)
    }

    /// Creates a fresh machine in its initial configuration.
    pub fn machine(&self) -> Machine {
        self.machine_with_config(MachineConfig::default())
    }

    pub fn machine_with_config(&self, config: MachineConfig) -> Machine {
        Machine::with_config(
            Arc::clone(&self.table),
            self.initial_tape(),
            self.initial_state,
            config,
        )
    }

    /// Replaces the initial tape with `input`, placed from position 0 onwards.
    ///
    /// # Errors
    ///
    /// * `MachineError::ValidationError` if `input` contains a character that is not a symbol.
    pub fn set_input(&mut self, input: &str) -> Result<(), MachineError> {
        self.tape = input
            .chars()
            .zip(0..)
            .map(|(c, position)| {
                Symbol::try_from(c)
                    .map(|symbol| (position, symbol))
                    .map_err(|c| {
                        MachineError::ValidationError(format!(
                            "Invalid tape symbol '{c}' at position {position}"
                        ))
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}

/// Represents the errors that can occur while building, loading or driving a machine.
///
/// Halting is not an error; see [`crate::machine::StepOutcome`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// A transition table contains an invalid key or value.
    #[error("Malformed transition table: {0}")]
    MalformedTable(String),
    /// An operation was called with an argument outside its contract.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// `undo` was called with nothing left to undo.
    #[error("No history to undo")]
    NoHistory,
    /// Indicates an error during the parsing of a program definition.
    #[error("Program parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates an error during the validation of a program's structure.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
}
