//! The callback contract a [`Machine`](crate::machine::Machine) uses to report snapshots.

use crate::machine::Snapshot;

/// Receives a [`Snapshot`] after every call that mutates a machine.
///
/// Observers are invoked synchronously, exactly once per mutating `step`, `manual_write` or
/// `manual_move`, and never for a step on an already halted machine. The machine does not look
/// at anything an observer does.
pub trait ExecutionObserver {
    fn on_step(&mut self, snapshot: &Snapshot);
}

impl<F> ExecutionObserver for F
where
    F: FnMut(&Snapshot),
{
    fn on_step(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// Dispatches each snapshot to several observers in registration order.
#[derive(Default)]
pub struct Fanout {
    observers: Vec<Box<dyn ExecutionObserver>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer and returns the composite, for chaining.
    pub fn with<O>(mut self, observer: O) -> Self
    where
        O: ExecutionObserver + 'static,
    {
        self.push(observer);
        self
    }

    pub fn push<O>(&mut self, observer: O)
    where
        O: ExecutionObserver + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ExecutionObserver for Fanout {
    fn on_step(&mut self, snapshot: &Snapshot) {
        for observer in &mut self.observers {
            observer.on_step(snapshot);
        }
    }
}
