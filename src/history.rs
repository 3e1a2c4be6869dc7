//! Bounded undo history.

use crate::machine::{Snapshot, Status};
use crate::types::{State, Symbol};
use std::collections::VecDeque;

/// What a mutation overwrote. Restoring it undoes the mutation.
///
/// Every mutation touches at most one cell (the one under the head before the mutation), so the
/// pre-mutation head and that cell's symbol are enough to rebuild the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub state: State,
    pub head: i64,
    pub symbol: Symbol,
    pub step_count: usize,
    pub status: Status,
}

/// A single recorded mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Machine status before the mutation.
    pub before: Checkpoint,
    /// Machine status after the mutation, as reported to the observer.
    pub after: Snapshot,
}

/// Ordered record of past mutations, oldest first.
///
/// With a limit, pushing beyond it evicts the oldest entry. `None` keeps everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    limit: Option<usize>,
}

impl History {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Records an entry, evicting from the front while over the limit.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.limit == Some(0) {
            return;
        }

        self.entries.push_back(entry);

        if let Some(limit) = self.limit {
            while self.entries.len() > limit {
                self.entries.pop_front();
            }
        }
    }

    /// Removes and returns the newest entry.
    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop_back()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Iterates from the oldest retained entry to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}
