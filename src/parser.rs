//! This module provides the parser for `.ptm` programs, utilizing the `pest` crate.
//! It defines the grammar binding and functions to turn the input into a [`Program`].

use crate::table::{RawEntry, TransitionTable};
use crate::types::{MachineError, Program, State, Symbol, DEFAULT_START_STATE, MAX_PROGRAM_SIZE};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::HashSet;
use std::sync::Arc;

/// Derives a `PestParser` for the program grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct ProgramParser;

/// Parses the given input string into a [`Program`].
///
/// This is the main entry point for parsing program definitions. Rule rows are validated by
/// [`TransitionTable::from_raw`], so the returned program always carries a trusted table.
///
/// # Returns
///
/// * `Ok(Program)` if the input is successfully parsed and validated.
/// * `Err(MachineError::ParseError)` if there are any syntax errors.
/// * `Err(MachineError::MalformedTable)` if a rule uses an invalid symbol or the reserved state.
/// * `Err(MachineError::ValidationError)` if a required section is missing or the input is too large.
pub fn parse(input: &str) -> Result<Program, MachineError> {
    if input.len() > MAX_PROGRAM_SIZE {
        return Err(MachineError::ValidationError(format!(
            "Program is {} bytes, the limit is {} bytes",
            input.len(),
            MAX_PROGRAM_SIZE
        )));
    }

    let root = ProgramParser::parse(Rule::program, input)
        .map_err(|e| MachineError::ParseError(Box::new(e)))?
        .next()
        .ok_or_else(|| MachineError::ValidationError("Empty program".to_string()))?;

    parse_program(root)
}

/// Parses the top-level structure of a program from a `Pair<Rule::program>`.
///
/// Each section may appear at most once; `name` and `rules` are mandatory.
fn parse_program(pair: Pair<Rule>) -> Result<Program, MachineError> {
    let mut name: Option<String> = None;
    let mut tape: Option<Vec<(i64, Symbol)>> = None;
    let mut head: Option<i64> = None;
    let mut start: Option<State> = None;
    let mut rules: Option<ParsedRules> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let rule = p.as_rule();

        check_unique_rule(rule, span, &mut seen)?;

        match rule {
            Rule::name => name = Some(parse_inner_string(p)?.trim().to_string()),
            Rule::tape => tape = Some(parse_cells(p)?),
            Rule::head => head = Some(parse_integer(p)?),
            Rule::start => start = Some(parse_state(next_pair(&mut p.into_inner(), span)?)?),
            Rule::rules => rules = Some(parse_rules(p)?),
            _ => {} // EOI
        }
    }

    let name = check_required_rule(name, "name")?;
    let rules = check_required_rule(rules, "rules")?;
    let table = TransitionTable::from_raw(rules.rows)?;

    Ok(Program {
        name,
        initial_state: start.or(rules.first_state).unwrap_or(DEFAULT_START_STATE),
        head: head.unwrap_or(0),
        tape: tape.unwrap_or_default(),
        table: Arc::new(table),
    })
}

/// Rows collected from the `rules:` section, before table validation.
struct ParsedRules {
    rows: Vec<RawEntry>,
    first_state: Option<State>,
}

/// Parses the `rules:` section. The first block names the default start state.
fn parse_rules(pair: Pair<Rule>) -> Result<ParsedRules, MachineError> {
    let mut rows = Vec::new();
    let mut first_state = None;
    let mut seen_states = HashSet::new();

    // Rule: rules > [block > state, [action]]
    for block in pair.into_inner() {
        let span = block.as_span();
        let mut pairs = block.into_inner();
        let state = parse_state(next_pair(&mut pairs, span)?)?;

        if !seen_states.insert(state) {
            return Err(parse_error(&format!("Duplicate rule block: {state}"), span));
        }
        first_state.get_or_insert(state);

        for action in pairs {
            rows.push(parse_action(state, action)?);
        }
    }

    Ok(ParsedRules { rows, first_state })
}

/// Parses a single row `read -> [write,] direction, next` of a state block.
///
/// If `write` is omitted the row writes back the symbol it read.
fn parse_action(state: State, pair: Pair<Rule>) -> Result<RawEntry, MachineError> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();

    let read = parse_char(next_pair(&mut pairs, span)?);
    let write = match pairs.peek().map(|p| p.as_rule()) {
        Some(Rule::symbol) => parse_char(next_pair(&mut pairs, span)?),
        _ => read,
    };
    let direction = parse_char(next_pair(&mut pairs, span)?);
    let next_state = parse_state(next_pair(&mut pairs, span)?)?;

    Ok(RawEntry {
        state,
        read,
        write,
        direction,
        next_state,
    })
}

/// Parses the `tape:` section into writes starting at position 0.
fn parse_cells(pair: Pair<Rule>) -> Result<Vec<(i64, Symbol)>, MachineError> {
    let mut cells = Vec::new();

    // Rule: tape > cells? > [cell]
    for cells_pair in pair.into_inner() {
        for (cell, position) in cells_pair.into_inner().zip(0..) {
            let c = parse_char(cell.clone());
            let symbol = Symbol::try_from(c).map_err(|c| {
                parse_error(&format!("Invalid tape symbol '{c}'"), cell.as_span())
            })?;
            cells.push((position, symbol));
        }
    }

    Ok(cells)
}

/// Parses the `head:` section.
fn parse_integer(pair: Pair<Rule>) -> Result<i64, MachineError> {
    let span = pair.as_span();
    let integer = next_pair(&mut pair.into_inner(), span)?;

    integer
        .as_str()
        .parse::<i64>()
        .map_err(|_| parse_error("Head position out of range", integer.as_span()))
}

/// Parses a state identifier from a `Pair<Rule::state>`.
fn parse_state(pair: Pair<Rule>) -> Result<State, MachineError> {
    pair.as_str()
        .parse::<State>()
        .map_err(|_| parse_error("State out of range", pair.as_span()))
}

/// Returns the single character of a symbol, cell or direction pair.
fn parse_char(pair: Pair<Rule>) -> char {
    pair.as_str().chars().next().unwrap_or('_')
}

/// Extracts the inner string content from a `Pair`.
fn parse_inner_string(pair: Pair<Rule>) -> Result<String, MachineError> {
    let span = pair.as_span();
    Ok(next_pair(&mut pair.into_inner(), span)?.as_str().into())
}

/// Takes the next pair the grammar guarantees, reporting a parse error at `span` if it is missing.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span<'i>) -> Result<Pair<'i, Rule>, MachineError> {
    pairs
        .next()
        .ok_or_else(|| parse_error("Unexpected end of section", span))
}

/// Creates a `MachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> MachineError {
    MachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Checks if a given section has already been declared.
fn check_unique_rule(
    rule: Rule,
    span: Span,
    seen: &mut HashSet<Rule>,
) -> Result<(), MachineError> {
    if !matches!(
        rule,
        Rule::name | Rule::tape | Rule::head | Rule::start | Rule::rules
    ) {
        return Ok(());
    };

    if !seen.insert(rule) {
        return Err(parse_error(
            &format!("Duplicate \"{rule:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

/// Checks if a required section is present, returning an `Err` if it's missing.
fn check_required_rule<T>(value: Option<T>, name: &str) -> Result<T, MachineError> {
    value.ok_or_else(|| MachineError::ValidationError(format!("Missing '{name}' section")))
}
