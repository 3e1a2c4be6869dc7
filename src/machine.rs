//! This module defines the `Machine` struct, which executes a [`TransitionTable`] against a
//! [`Tape`]. It handles single steps, bounded runs, manual edits of the tape and undo.

use crate::history::{Checkpoint, History, HistoryEntry};
use crate::observer::ExecutionObserver;
use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{Direction, MachineError, State, Symbol, Transition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a machine, independent of its control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// No step has been taken yet.
    Ready,
    /// At least one step was taken and the machine has not halted.
    Running,
    /// A step found no matching table entry.
    Halted,
}

/// What produced a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A table entry was applied.
    Transition(Transition),
    /// No table entry matched; the machine halted.
    Halted,
    /// The tape was written by hand.
    ManualWrite(Symbol),
    /// The head was moved by hand.
    ManualMove(Direction),
}

/// Machine status taken right after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Control state after the mutation.
    pub state: State,
    /// Head position after the mutation.
    pub head: i64,
    /// Symbol under the head after the mutation.
    pub symbol: Symbol,
    pub event: Event,
    /// Number of table-driven steps taken so far.
    pub step_count: usize,
}

/// Represents the outcome of a call to [`Machine::step`], [`Machine::manual_write`] or
/// [`Machine::manual_move`]. None of these are errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A transition was applied.
    Advanced { snapshot: Snapshot },
    /// No transition matched the current state and symbol; the machine is now halted.
    Halted {
        final_state: State,
        final_symbol: Symbol,
    },
    /// The machine was already halted; nothing changed.
    AlreadyHalted,
    /// The tape was edited by hand.
    Manual { snapshot: Snapshot },
}

/// Represents the outcome of [`Machine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Halted { steps_taken: usize },
    StepLimitExceeded { steps_taken: usize },
}

/// Options a collaborator can set when creating a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Maximum number of undo entries kept. `None` keeps every entry.
    pub history_limit: Option<usize>,
}

/// A single-tape machine over the `{Blank, Zero, One}` alphabet.
///
/// The machine is driven synchronously by its caller: every method runs to completion and there
/// is no background activity. Pacing (for an animated "slow" mode) and cancellation belong to the
/// caller, which can loop over [`Machine::step`] itself. The table is shared read-only; build a
/// fresh machine for every execution rather than rewinding an old one.
pub struct Machine {
    table: Arc<TransitionTable>,
    tape: Tape,
    state: State,
    status: Status,
    step_count: usize,
    history: History,
    config: MachineConfig,
    observer: Option<Box<dyn ExecutionObserver>>,
}

impl Machine {
    /// Creates a machine with the default configuration (unbounded history).
    ///
    /// # Arguments
    ///
    /// * `table` - The validated transition table, possibly shared with other machines.
    /// * `tape` - The initial tape, including its head position.
    /// * `initial_state` - The control state of the first step.
    pub fn new(table: Arc<TransitionTable>, tape: Tape, initial_state: State) -> Self {
        Self::with_config(table, tape, initial_state, MachineConfig::default())
    }

    pub fn with_config(
        table: Arc<TransitionTable>,
        tape: Tape,
        initial_state: State,
        config: MachineConfig,
    ) -> Self {
        Self {
            table,
            tape,
            state: initial_state,
            status: Status::Ready,
            step_count: 0,
            history: History::new(config.history_limit),
            config,
            observer: None,
        }
    }

    /// Attaches an observer, replacing any previous one.
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: ExecutionObserver + 'static,
    {
        self.set_observer(observer);
        self
    }

    pub fn set_observer<O>(&mut self, observer: O)
    where
        O: ExecutionObserver + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Detaches and returns the current observer.
    pub fn take_observer(&mut self) -> Option<Box<dyn ExecutionObserver>> {
        self.observer.take()
    }

    /// Executes a single step.
    ///
    /// Reads the symbol under the head and looks up `(state, symbol)`. A matching entry is
    /// written, the head moves and the state changes. Without a matching entry the machine halts
    /// and the tape is left untouched.
    ///
    /// # Returns
    ///
    /// * `StepOutcome::Advanced` if a transition was applied.
    /// * `StepOutcome::Halted` if no transition matched.
    /// * `StepOutcome::AlreadyHalted` if a previous step halted the machine.
    pub fn step(&mut self) -> StepOutcome {
        if self.is_halted() {
            return StepOutcome::AlreadyHalted;
        }

        let before = self.checkpoint();
        let symbol = self.tape.read();

        let Some(transition) = self.table.lookup(self.state, symbol) else {
            self.status = Status::Halted;
            let snapshot = self.snapshot(Event::Halted);
            self.record(before, snapshot);

            return StepOutcome::Halted {
                final_state: self.state,
                final_symbol: symbol,
            };
        };

        self.tape.write(transition.write);
        self.tape.move_head(transition.direction);
        self.state = transition.next_state;
        self.step_count += 1;
        self.status = Status::Running;

        let snapshot = self.snapshot(Event::Transition(transition));
        self.record(before, snapshot);

        StepOutcome::Advanced { snapshot }
    }

    /// Runs the machine until it halts or `max_steps` transitions have been applied.
    ///
    /// When the limit is reached exactly as the machine runs out of rules, the final halting
    /// step is still taken (it never writes the tape) and the run reports `Halted`.
    ///
    /// # Errors
    ///
    /// * `MachineError::InvalidArgument` if `max_steps` is zero or negative.
    pub fn run(&mut self, max_steps: i64) -> Result<RunOutcome, MachineError> {
        if max_steps <= 0 {
            return Err(MachineError::InvalidArgument(format!(
                "max_steps must be positive, got {max_steps}"
            )));
        }

        let limit = usize::try_from(max_steps).unwrap_or(usize::MAX);
        let mut steps_taken = 0;

        loop {
            if steps_taken >= limit && self.transition().is_some() {
                return Ok(RunOutcome::StepLimitExceeded { steps_taken });
            }

            if let StepOutcome::Advanced { .. } = self.step() {
                steps_taken += 1;
            } else {
                return Ok(RunOutcome::Halted { steps_taken });
            }
        }
    }

    /// Reverts the most recent mutation (step, halt or manual edit).
    ///
    /// # Returns
    ///
    /// * `Ok(Snapshot)` - the snapshot of the mutation that was undone.
    /// * `Err(MachineError::NoHistory)` if there is nothing left to undo.
    pub fn undo(&mut self) -> Result<Snapshot, MachineError> {
        let entry = self.history.pop().ok_or(MachineError::NoHistory)?;
        let before = entry.before;

        self.tape.set_position(before.head);
        self.tape.write(before.symbol);
        self.state = before.state;
        self.step_count = before.step_count;
        self.status = before.status;

        Ok(entry.after)
    }

    /// Writes a symbol under the head without consulting the table.
    pub fn manual_write(&mut self, symbol: Symbol) -> StepOutcome {
        let before = self.checkpoint();
        self.tape.write(symbol);

        let snapshot = self.snapshot(Event::ManualWrite(symbol));
        self.record(before, snapshot);

        StepOutcome::Manual { snapshot }
    }

    /// Moves the head without consulting the table.
    pub fn manual_move(&mut self, direction: Direction) -> StepOutcome {
        let before = self.checkpoint();
        self.tape.move_head(direction);

        let snapshot = self.snapshot(Event::ManualMove(direction));
        self.record(before, snapshot);

        StepOutcome::Manual { snapshot }
    }

    /// Returns the entry the next step would apply, or `None` if it would halt.
    pub fn transition(&self) -> Option<Transition> {
        if self.is_halted() {
            return None;
        }
        self.table.lookup(self.state, self.tape.read())
    }

    /// Returns the current control state.
    pub fn state(&self) -> State {
        self.state
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_halted(&self) -> bool {
        self.status == Status::Halted
    }

    /// Returns the number of transitions applied so far.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Returns the head position.
    pub fn head(&self) -> i64 {
        self.tape.position()
    }

    /// Returns the symbol under the head.
    pub fn symbol(&self) -> Symbol {
        self.tape.read()
    }

    pub fn table(&self) -> &Arc<TransitionTable> {
        &self.table
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            state: self.state,
            head: self.tape.position(),
            symbol: self.tape.read(),
            step_count: self.step_count,
            status: self.status,
        }
    }

    fn snapshot(&self, event: Event) -> Snapshot {
        Snapshot {
            state: self.state,
            head: self.tape.position(),
            symbol: self.tape.read(),
            event,
            step_count: self.step_count,
        }
    }

    fn record(&mut self, before: Checkpoint, snapshot: Snapshot) {
        self.history.push(HistoryEntry {
            before,
            after: snapshot,
        });

        if let Some(observer) = self.observer.as_mut() {
            observer.on_step(&snapshot);
        }
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("status", &self.status)
            .field("step_count", &self.step_count)
            .field("tape", &self.tape)
            .field("history", &self.history.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// `(1, 0) -> (1, R, 1)`, `(1, b) -> (b, S, 2)`, nothing for state 2.
    fn create_fill_table() -> Arc<TransitionTable> {
        Arc::new(
            TransitionTable::new([
                (
                    (1, Symbol::Zero),
                    Transition::new(Symbol::One, Direction::Right, 1),
                ),
                (
                    (1, Symbol::Blank),
                    Transition::new(Symbol::Blank, Direction::Stay, 2),
                ),
            ])
            .unwrap(),
        )
    }

    fn create_fill_machine() -> Machine {
        let tape = Tape::from_cells([(0, Symbol::Zero), (1, Symbol::Zero)], 0);
        Machine::new(create_fill_table(), tape, 1)
    }

    #[test]
    fn test_machine_creation() {
        let machine = create_fill_machine();

        assert_eq!(machine.state(), 1);
        assert_eq!(machine.status(), Status::Ready);
        assert_eq!(machine.head(), 0);
        assert_eq!(machine.symbol(), Symbol::Zero);
        assert_eq!(machine.step_count(), 0);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_single_step() {
        let mut machine = create_fill_machine();

        let result = machine.step();

        let expected = Snapshot {
            state: 1,
            head: 1,
            symbol: Symbol::Zero,
            event: Event::Transition(Transition::new(Symbol::One, Direction::Right, 1)),
            step_count: 1,
        };
        assert_eq!(result, StepOutcome::Advanced { snapshot: expected });
        assert_eq!(machine.status(), Status::Running);
        assert_eq!(machine.tape().read_at(0), Symbol::One);
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn test_fill_scenario_halts_after_three_steps() {
        let mut machine = create_fill_machine();

        assert!(matches!(machine.step(), StepOutcome::Advanced { .. }));
        assert!(matches!(machine.step(), StepOutcome::Advanced { .. }));
        assert!(matches!(machine.step(), StepOutcome::Advanced { .. }));
        assert_eq!(machine.state(), 2);
        assert_eq!(machine.head(), 2);

        assert_eq!(
            machine.step(),
            StepOutcome::Halted {
                final_state: 2,
                final_symbol: Symbol::Blank
            }
        );
        assert_eq!(machine.step_count(), 3);
        assert_eq!(
            machine.tape().cells().collect::<Vec<_>>(),
            vec![(0, Symbol::One), (1, Symbol::One)]
        );
    }

    #[test]
    fn test_run_to_completion() {
        let mut machine = create_fill_machine();

        let outcome = machine.run(100).unwrap();
        assert_eq!(outcome, RunOutcome::Halted { steps_taken: 3 });
        assert!(machine.is_halted());
        assert_eq!(machine.tape().to_string(), "11b");
    }

    #[test]
    fn test_run_with_exact_limit_still_halts() {
        let mut machine = create_fill_machine();
        assert_eq!(machine.run(3), Ok(RunOutcome::Halted { steps_taken: 3 }));
    }

    #[test]
    fn test_run_step_limit_exceeded() {
        let mut machine = create_fill_machine();

        let outcome = machine.run(2).unwrap();
        assert_eq!(outcome, RunOutcome::StepLimitExceeded { steps_taken: 2 });
        assert!(!machine.is_halted());
        assert_eq!(machine.step_count(), 2);

        // Resuming picks up where the limit stopped.
        assert_eq!(machine.run(10), Ok(RunOutcome::Halted { steps_taken: 1 }));
    }

    #[test]
    fn test_run_never_halting_program() {
        let table = Arc::new(
            TransitionTable::new([(
                (1, Symbol::Blank),
                Transition::new(Symbol::One, Direction::Right, 1),
            )])
            .unwrap(),
        );
        let mut machine = Machine::new(table, Tape::new(), 1);

        assert_eq!(
            machine.run(50),
            Ok(RunOutcome::StepLimitExceeded { steps_taken: 50 })
        );
        assert_eq!(machine.tape().cells().count(), 50);
    }

    #[test]
    fn test_run_rejects_non_positive_limit() {
        let mut machine = create_fill_machine();

        assert!(matches!(
            machine.run(0),
            Err(MachineError::InvalidArgument(_))
        ));
        assert!(matches!(
            machine.run(-5),
            Err(MachineError::InvalidArgument(_))
        ));
        assert_eq!(machine.status(), Status::Ready);
    }

    #[test]
    fn test_run_on_halted_machine() {
        let mut machine = create_fill_machine();
        machine.run(10).unwrap();

        assert_eq!(machine.run(10), Ok(RunOutcome::Halted { steps_taken: 0 }));
    }

    #[test]
    fn test_step_at_end_of_range() {
        let table = Arc::new(
            TransitionTable::new([(
                (1, Symbol::Blank),
                Transition::new(Symbol::One, Direction::Right, 0),
            )])
            .unwrap(),
        );
        let mut tape = Tape::new();
        tape.set_position(i64::MAX);
        let mut machine = Machine::new(table, tape, 1);

        assert_eq!(machine.run(10), Ok(RunOutcome::Halted { steps_taken: 1 }));
        assert_eq!(machine.head(), i64::MAX);
        assert_eq!(machine.symbol(), Symbol::One);
        assert_eq!(machine.tape().to_string(), "1");

        machine.undo().unwrap();
        machine.undo().unwrap();
        assert_eq!(machine.head(), i64::MAX);
        assert_eq!(machine.symbol(), Symbol::Blank);
    }

    #[test]
    fn test_halting_leaves_tape_untouched() {
        let tape = Tape::from_cells([(0, Symbol::One), (3, Symbol::Zero)], 0);
        let mut machine = Machine::new(create_fill_table(), tape.clone(), 1);

        assert_eq!(
            machine.step(),
            StepOutcome::Halted {
                final_state: 1,
                final_symbol: Symbol::One
            }
        );
        assert_eq!(machine.tape(), &tape);
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_already_halted_is_a_no_op() {
        let mut machine = create_fill_machine();
        machine.run(10).unwrap();
        let history_len = machine.history().len();

        assert_eq!(machine.step(), StepOutcome::AlreadyHalted);
        assert_eq!(machine.step(), StepOutcome::AlreadyHalted);
        assert_eq!(machine.history().len(), history_len);
        assert_eq!(machine.transition(), None);
    }

    #[test]
    fn test_step_then_undo_restores() {
        let mut machine = create_fill_machine();
        machine.step();

        let tape = machine.tape().clone();
        let state = machine.state();

        machine.step();
        let undone = machine.undo().unwrap();

        assert_eq!(undone.step_count, 2);
        assert_eq!(machine.tape(), &tape);
        assert_eq!(machine.state(), state);
        assert_eq!(machine.step_count(), 1);
    }

    #[test]
    fn test_undo_halt_resumes_execution() {
        let mut machine = create_fill_machine();
        machine.run(10).unwrap();
        assert!(machine.is_halted());

        let undone = machine.undo().unwrap();
        assert_eq!(undone.event, Event::Halted);
        assert_eq!(machine.status(), Status::Running);
        assert_eq!(machine.state(), 2);

        // Undo the `(1, b)` step as well.
        machine.undo().unwrap();
        assert_eq!(machine.state(), 1);
        assert_eq!(machine.step_count(), 2);
    }

    #[test]
    fn test_undo_back_to_ready() {
        let mut machine = create_fill_machine();
        let initial = machine.tape().clone();

        machine.run(10).unwrap();
        while machine.undo().is_ok() {}

        assert_eq!(machine.tape(), &initial);
        assert_eq!(machine.status(), Status::Ready);
        assert_eq!(machine.state(), 1);
        assert_eq!(machine.step_count(), 0);
        assert_eq!(machine.undo(), Err(MachineError::NoHistory));
    }

    #[test]
    fn test_undo_empty_history() {
        let mut machine = create_fill_machine();
        assert_eq!(machine.undo(), Err(MachineError::NoHistory));
    }

    #[test]
    fn test_manual_write_then_undo() {
        let mut machine = create_fill_machine();

        let outcome = machine.manual_write(Symbol::One);
        match outcome {
            StepOutcome::Manual { snapshot } => {
                assert_eq!(snapshot.event, Event::ManualWrite(Symbol::One));
                assert_eq!(snapshot.symbol, Symbol::One);
                assert_eq!(snapshot.step_count, 0);
            }
            other => panic!("Expected a Manual outcome, got {:?}", other),
        }
        assert_eq!(machine.symbol(), Symbol::One);

        machine.undo().unwrap();
        assert_eq!(machine.symbol(), Symbol::Zero);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_manual_move_then_undo() {
        let mut machine = create_fill_machine();

        machine.manual_move(Direction::Left);
        machine.manual_move(Direction::Left);
        assert_eq!(machine.head(), -2);

        machine.undo().unwrap();
        assert_eq!(machine.head(), -1);
        machine.undo().unwrap();
        assert_eq!(machine.head(), 0);
    }

    #[test]
    fn test_manual_edits_change_next_transition() {
        let mut machine = create_fill_machine();
        machine.manual_write(Symbol::Blank);

        assert_eq!(
            machine.transition(),
            Some(Transition::new(Symbol::Blank, Direction::Stay, 2))
        );
        assert_eq!(machine.run(10), Ok(RunOutcome::Halted { steps_taken: 1 }));
        assert_eq!(machine.tape().read_at(1), Symbol::Zero);
    }

    #[test]
    fn test_manual_edit_on_halted_machine() {
        let mut machine = create_fill_machine();
        machine.run(10).unwrap();

        machine.manual_write(Symbol::Zero);
        assert!(machine.is_halted());
        assert_eq!(machine.step(), StepOutcome::AlreadyHalted);

        machine.undo().unwrap();
        assert_eq!(machine.symbol(), Symbol::Blank);
    }

    #[test]
    fn test_history_limit() {
        let config = MachineConfig {
            history_limit: Some(2),
        };
        let tape = Tape::from_cells([(0, Symbol::Zero), (1, Symbol::Zero)], 0);
        let mut machine = Machine::with_config(create_fill_table(), tape, 1, config);

        machine.run(10).unwrap();
        assert_eq!(machine.history().len(), 2);
        assert_eq!(machine.history().limit(), Some(2));

        machine.undo().unwrap();
        machine.undo().unwrap();
        assert_eq!(machine.undo(), Err(MachineError::NoHistory));
        assert_eq!(machine.step_count(), 2);
    }

    #[test]
    fn test_observer_sees_every_mutation() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut machine =
            create_fill_machine().with_observer(move |s: &Snapshot| sink.borrow_mut().push(*s));

        machine.manual_move(Direction::Stay);
        machine.run(10).unwrap();
        machine.step();
        machine.undo().unwrap();

        let events: Vec<Event> = seen.borrow().iter().map(|s| s.event).collect();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], Event::ManualMove(Direction::Stay));
        assert!(matches!(events[1], Event::Transition(_)));
        assert_eq!(events[4], Event::Halted);
    }

    #[test]
    fn test_take_observer() {
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);

        let mut machine = create_fill_machine();
        machine.set_observer(move |_: &Snapshot| *sink.borrow_mut() += 1);
        machine.step();

        assert!(machine.take_observer().is_some());
        machine.step();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_shared_table() {
        let table = create_fill_table();
        let mut first = Machine::new(Arc::clone(&table), Tape::new(), 1);
        let mut second = Machine::new(
            Arc::clone(&table),
            Tape::from_cells([(0, Symbol::Zero)], 0),
            1,
        );

        assert_eq!(first.run(10), Ok(RunOutcome::Halted { steps_taken: 1 }));
        assert_eq!(second.run(10), Ok(RunOutcome::Halted { steps_taken: 2 }));
        assert_eq!(Arc::strong_count(&table), 3);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = Snapshot {
            state: 2,
            head: -1,
            symbol: Symbol::One,
            event: Event::ManualWrite(Symbol::One),
            step_count: 4,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_config_defaults() {
        let config: MachineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MachineConfig::default());
        assert_eq!(config.history_limit, None);
    }
}
