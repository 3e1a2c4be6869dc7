//! This crate provides the core logic for a three-symbol tape machine interpreter.
//! It includes the sparse tape, validated transition tables, a machine with step, run and undo,
//! and an observer hook for visualizers. Around that core it offers a `.ptm` program loader,
//! a static analyzer and a small collection of built-in programs.

pub mod analyzer;
pub mod history;
pub mod loader;
pub mod machine;
pub mod observer;
pub mod parser;
pub mod programs;
pub mod table;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `Diagnostic` enum from the analyzer module.
pub use analyzer::{analyze, Diagnostic};
/// Re-exports the undo history types.
pub use history::{History, HistoryEntry};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the machine and the values it reports.
pub use machine::{Event, Machine, MachineConfig, RunOutcome, Snapshot, Status, StepOutcome};
/// Re-exports the observer contract and its fan-out composite.
pub use observer::{ExecutionObserver, Fanout};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
/// Re-exports the transition table.
pub use table::{RawEntry, TransitionTable};
/// Re-exports the tape.
pub use tape::Tape;
/// Re-exports the alphabet, moves, program and error types from the types module.
pub use types::{
    Direction, MachineError, Program, State, Symbol, Transition, HALT_STATE, MAX_EXECUTION_STEPS,
    MAX_PROGRAM_SIZE,
};
