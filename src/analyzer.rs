//! This module provides functions for analyzing programs to detect likely mistakes before
//! execution: an undefined start state, next states without rules, unreachable states and states
//! that do not handle every symbol.
//!
//! A missing rule is not an error for the machine (it simply halts there), so every finding is
//! reported as a [`Diagnostic`] and none of them stop a program from running.

use crate::types::{Program, State, Symbol, HALT_STATE};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Represents the findings of [`analyze`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Diagnostic {
    /// The start state has no rules, so the machine halts on its first step.
    StartStateUndefined(State),
    /// Transitions lead to states (other than the halt sentinel) that have no rules.
    UndefinedNextStates(Vec<State>),
    /// States that have rules but cannot be reached from the start state.
    UnreachableStates(Vec<State>),
    /// States that lack a rule for some symbols.
    IncompleteStates(Vec<(State, Vec<Symbol>)>),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::StartStateUndefined(state) => {
                write!(f, "Start state {state} has no rules")
            }
            Diagnostic::UndefinedNextStates(states) => {
                write!(f, "Transitions lead to states without rules: {states:?}")
            }
            Diagnostic::UnreachableStates(states) => {
                write!(f, "Unreachable states detected: {states:?}")
            }
            Diagnostic::IncompleteStates(states) => {
                let states = states
                    .iter()
                    .map(|(state, missing)| {
                        let missing: String = missing.iter().map(|s| s.as_char()).collect();
                        format!("{state} (missing {missing})")
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "States that halt on some symbols: {states}")
            }
        }
    }
}

/// Analyzes a given [`Program`] and returns every finding, in a fixed order.
///
/// An empty vector means the program has no findings.
pub fn analyze(program: &Program) -> Vec<Diagnostic> {
    [
        check_start_state,
        check_undefined_next_states,
        check_unreachable_states,
        check_incomplete_states,
    ]
    .iter()
    .filter_map(|f| f(program))
    .collect()
}

/// Checks whether the start state has at least one rule.
fn check_start_state(program: &Program) -> Option<Diagnostic> {
    (!program.table.states().contains(&program.initial_state))
        .then_some(Diagnostic::StartStateUndefined(program.initial_state))
}

/// Checks that every `next_state` either has rules or is the halt sentinel.
fn check_undefined_next_states(program: &Program) -> Option<Diagnostic> {
    let defined = program.table.states();

    let undefined: BTreeSet<State> = program
        .table
        .iter()
        .map(|(_, transition)| transition.next_state)
        .filter(|state| *state != HALT_STATE && !defined.contains(state))
        .collect();

    (!undefined.is_empty())
        .then(|| Diagnostic::UndefinedNextStates(undefined.into_iter().collect()))
}

/// Checks for unreachable states with a depth-first traversal from the start state.
fn check_unreachable_states(program: &Program) -> Option<Diagnostic> {
    let mut successors: BTreeMap<State, BTreeSet<State>> = BTreeMap::new();
    for ((state, _), transition) in program.table.iter() {
        successors
            .entry(state)
            .or_default()
            .insert(transition.next_state);
    }

    let mut visited = BTreeSet::new();
    let mut queue = vec![program.initial_state];

    while let Some(state) = queue.pop() {
        if !visited.insert(state) {
            continue;
        }

        if let Some(next_states) = successors.get(&state) {
            queue.extend(next_states.iter().filter(|s| !visited.contains(*s)));
        }
    }

    let unreachable: Vec<State> = program
        .table
        .states()
        .difference(&visited)
        .copied()
        .collect();

    (!unreachable.is_empty()).then_some(Diagnostic::UnreachableStates(unreachable))
}

/// Checks that every state with rules has one for each symbol.
fn check_incomplete_states(program: &Program) -> Option<Diagnostic> {
    let incomplete: Vec<(State, Vec<Symbol>)> = program
        .table
        .states()
        .into_iter()
        .filter_map(|state| {
            let missing: Vec<Symbol> = Symbol::ALL
                .into_iter()
                .filter(|&symbol| program.table.lookup(state, symbol).is_none())
                .collect();
            (!missing.is_empty()).then_some((state, missing))
        })
        .collect();

    (!incomplete.is_empty()).then_some(Diagnostic::IncompleteStates(incomplete))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_complete_program_has_no_findings() {
        let program = parse(
            r#"
name: Invert
tape: 10
rules:
  1:
    0 -> 1, >, 1
    1 -> 0, >, 1
    b -> -, 0
"#,
        )
        .unwrap();

        assert!(analyze(&program).is_empty());
    }

    #[test]
    fn test_start_state_undefined() {
        let program = parse("name: Empty\nstart: 5\nrules:\n  1:\n    b -> -, 0\n    0 -> -, 0\n    1 -> -, 0\n").unwrap();

        let findings = analyze(&program);
        assert_eq!(findings[0], Diagnostic::StartStateUndefined(5));
        assert_eq!(findings[1], Diagnostic::UnreachableStates(vec![1]));
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn test_undefined_next_states() {
        let program = parse(
            r#"
name: Dangling
rules:
  1:
    b -> 1, >, 7
    0 -> 0, >, 3
    1 -> 1, >, 0
"#,
        )
        .unwrap();

        assert_eq!(
            analyze(&program),
            vec![Diagnostic::UndefinedNextStates(vec![3, 7])]
        );
    }

    #[test]
    fn test_unreachable_and_incomplete() {
        let program = parse(
            r#"
name: Partial
rules:
  1:
    b -> 1, >, 2
  2:
    b -> -, 0
    0 -> -, 0
    1 -> -, 0
  9:
    0 -> -, 1
"#,
        )
        .unwrap();

        let findings = analyze(&program);
        assert_eq!(
            findings,
            vec![
                Diagnostic::UnreachableStates(vec![9]),
                Diagnostic::IncompleteStates(vec![
                    (1, vec![Symbol::Zero, Symbol::One]),
                    (9, vec![Symbol::Blank, Symbol::One]),
                ]),
            ]
        );
        assert_eq!(
            findings[1].to_string(),
            "States that halt on some symbols: 1 (missing 01), 9 (missing b1)"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(
            Diagnostic::StartStateUndefined(3).to_string(),
            "Start state 3 has no rules"
        );
        assert_eq!(
            Diagnostic::UnreachableStates(vec![4, 5]).to_string(),
            "Unreachable states detected: [4, 5]"
        );
    }
}
