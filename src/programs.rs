//! Built-in programs, embedded at compile time and parsed once on first use.

use crate::types::{MachineError, Program, State};

// Default embedded programs, keyed by file stem.
const PROGRAM_TEXTS: [(&str, &str); 3] = [
    (
        "invert_values",
        include_str!("../programs/invert_values.ptm"),
    ),
    (
        "add_one_binary",
        include_str!("../programs/add_one_binary.ptm"),
    ),
    (
        "remove_one_binary",
        include_str!("../programs/remove_one_binary.ptm"),
    ),
];

/// A built-in program together with the key and source it was parsed from.
pub struct BuiltinProgram {
    pub key: &'static str,
    pub text: &'static str,
    pub program: Program,
}

lazy_static::lazy_static! {
    pub static ref PROGRAMS: Vec<BuiltinProgram> = PROGRAM_TEXTS
        .iter()
        .filter_map(|&(key, text)| {
            crate::parser::parse(text)
                .ok()
                .map(|program| BuiltinProgram { key, text, program })
        })
        .collect();
}

/// Summary of a built-in program, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub index: usize,
    pub key: String,
    pub name: String,
    pub initial_state: State,
    pub initial_tape: String,
    pub state_count: usize,
    pub transition_count: usize,
}

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn count() -> usize {
        PROGRAMS.len()
    }

    /// Get a program by its index
    pub fn get_by_index(index: usize) -> Result<Program, MachineError> {
        PROGRAMS
            .get(index)
            .map(|builtin| builtin.program.clone())
            .ok_or_else(|| {
                MachineError::ValidationError(format!("Program index {} out of range", index))
            })
    }

    /// Get a program by its key (`add_one_binary`) or its display name (`Add one (binary)`).
    pub fn get_by_name(name: &str) -> Result<Program, MachineError> {
        PROGRAMS
            .iter()
            .find(|builtin| builtin.key == name || builtin.program.name == name)
            .map(|builtin| builtin.program.clone())
            .ok_or_else(|| MachineError::ValidationError(format!("Program '{}' not found", name)))
    }

    /// Get the source text of a program by its index
    pub fn get_text_by_index(index: usize) -> Result<&'static str, MachineError> {
        PROGRAMS.get(index).map(|builtin| builtin.text).ok_or_else(|| {
            MachineError::ValidationError(format!("Program index {} out of range", index))
        })
    }

    /// List all program keys
    pub fn keys() -> Vec<&'static str> {
        PROGRAMS.iter().map(|builtin| builtin.key).collect()
    }

    /// List all program names
    pub fn names() -> Vec<String> {
        PROGRAMS
            .iter()
            .map(|builtin| builtin.program.name.clone())
            .collect()
    }

    /// Get information about a program by its index
    pub fn info(index: usize) -> Result<ProgramInfo, MachineError> {
        let builtin = PROGRAMS.get(index).ok_or_else(|| {
            MachineError::ValidationError(format!("Program index {} out of range", index))
        })?;
        let program = &builtin.program;

        Ok(ProgramInfo {
            index,
            key: builtin.key.to_string(),
            name: program.name.clone(),
            initial_state: program.initial_state,
            initial_tape: program.initial_tape().to_string(),
            state_count: program.table.states().len(),
            transition_count: program.table.len(),
        })
    }
}
