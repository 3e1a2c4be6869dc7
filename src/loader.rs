//! This module provides the `ProgramLoader` struct, responsible for loading `.ptm` programs
//! from files, directories and strings.

use crate::parser::parse;
use crate::types::{MachineError, Program};
use std::fs;
use std::path::{Path, PathBuf};

/// The file extension of program files.
pub const PROGRAM_EXTENSION: &str = "ptm";

/// `ProgramLoader` is a utility struct for loading programs.
/// It provides methods to load programs from individual files, from string content,
/// and to discover and load all `.ptm` files within a specified directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single program from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is successfully read and parsed into a `Program`.
    /// * `Err(MachineError::FileError)` if the file cannot be read.
    /// * Any error returned by [`parse`] if the content is not a valid program.
    pub fn load_program(path: &Path) -> Result<Program, MachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            MachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        parse(&content)
    }

    /// Loads a single program from the provided string content, e.g. from stdin.
    pub fn load_program_from_string(content: &str) -> Result<Program, MachineError> {
        parse(content)
    }

    /// Loads all program files (`.ptm` extension) from a given directory.
    ///
    /// Directories and files with other extensions are skipped. Each remaining file yields one
    /// result, so a single broken program does not hide the others.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), MachineError>> {
        if !directory.exists() {
            return vec![Err(MachineError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(MachineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                if path.is_dir() || path.extension().is_none_or(|ext| ext != PROGRAM_EXTENSION) {
                    return None;
                }

                Some(
                    Self::load_program(&path)
                        .map(|program| (path.clone(), program))
                        .map_err(|e| {
                            MachineError::FileError(format!(
                                "Failed to load program from {}: {}",
                                path.display(),
                                e
                            ))
                        }),
                )
            })
            .collect();

        // Directory order is platform dependent.
        results.sort_by(|a, b| match (a, b) {
            (Ok((a, _)), Ok((b, _))) => a.cmp(b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(a), Err(b)) => a.to_string().cmp(&b.to_string()),
        });

        results
    }
}
