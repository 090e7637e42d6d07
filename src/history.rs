//! Linear undo/redo history of whole-dashboard snapshots.
//!
//! DESIGN
//! ======
//! `past` holds snapshots oldest-first, `future` holds snapshots
//! nearest-undo-first. Recording a new edit discards the redo branch. Every
//! entry is an owned clone, so later mutation of the live dashboard can
//! never reach back into an already recorded snapshot.
//!
//! `past` is bounded; once the limit is reached the oldest snapshot is
//! dropped.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::consts::DEFAULT_HISTORY_LIMIT;
use crate::model::Dashboard;

#[derive(Debug, Clone, PartialEq)]
pub struct History {
    past: VecDeque<Dashboard>,
    present: Option<Dashboard>,
    future: VecDeque<Dashboard>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// Empty history keeping at most `limit` undo snapshots (minimum 1).
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { past: VecDeque::new(), present: None, future: VecDeque::new(), limit: limit.max(1) }
    }

    #[must_use]
    pub fn present(&self) -> Option<&Dashboard> {
        self.present.as_ref()
    }

    /// Snapshots that `undo` would restore, oldest first.
    pub fn past(&self) -> impl ExactSizeIterator<Item = &Dashboard> {
        self.past.iter()
    }

    /// Snapshots that `redo` would restore, nearest first.
    pub fn future(&self) -> impl ExactSizeIterator<Item = &Dashboard> {
        self.future.iter()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Start a fresh timeline at `present`, dropping both stacks.
    pub fn reset(&mut self, present: Dashboard) {
        self.past.clear();
        self.future.clear();
        self.present = Some(present);
    }

    /// Record an edit: push the current present onto `past`, clear `future`,
    /// and install `next` as the present.
    pub fn record(&mut self, next: Dashboard) {
        if let Some(previous) = self.present.take() {
            self.past.push_back(previous);
            while self.past.len() > self.limit {
                self.past.pop_front();
            }
        }
        self.future.clear();
        self.present = Some(next);
    }

    /// Replace the present without recording an edit (remote patches).
    pub fn replace_present(&mut self, present: Dashboard) {
        self.present = Some(present);
    }

    /// Step back one edit, returning the restored dashboard.
    ///
    /// Returns `None` and leaves everything untouched when `past` is empty.
    pub fn undo(&mut self) -> Option<&Dashboard> {
        let current = self.present.as_ref()?;
        let previous = self.past.pop_back()?;
        self.future.push_front(current.clone());
        self.present = Some(previous);
        self.present.as_ref()
    }

    /// Step forward one undone edit, returning the restored dashboard.
    ///
    /// Returns `None` and leaves everything untouched when `future` is empty.
    pub fn redo(&mut self) -> Option<&Dashboard> {
        let current = self.present.as_ref()?;
        let next = self.future.pop_front()?;
        self.past.push_back(current.clone());
        self.present = Some(next);
        self.present.as_ref()
    }
}
