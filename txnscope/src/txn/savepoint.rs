// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Savepoint stack
//!
//! Named checkpoints into a transaction's [`ChangeLog`]. Names may repeat;
//! lookups always resolve to the most recently defined savepoint with the
//! requested name. Releasing or rolling back to a savepoint cascades to every
//! savepoint defined after it.

use thiserror::Error;

use super::log::{ChangeLog, ChangePosition, ChangeRecord, UndoFailure};
use crate::storage::StorageFault;

/// A named marker into the change log
#[derive(Debug, Clone)]
pub struct Savepoint {
    pub name: String,
    /// Change log position at the moment the savepoint was defined
    pub position: ChangePosition,
}

/// Errors raised by the savepoint stack
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SavepointError {
    #[error("Savepoint not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Undo(#[from] UndoFailure),
}

/// Stack of savepoints ordered by creation time
#[derive(Debug, Clone, Default)]
pub struct SavepointStack {
    entries: Vec<Savepoint>,
}

impl SavepointStack {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Define a savepoint at `position` and return its index
    pub fn push(&mut self, name: impl Into<String>, position: ChangePosition) -> usize {
        debug_assert!(
            self.entries
                .last()
                .map_or(true, |top| top.position <= position),
            "savepoint positions must be non-decreasing"
        );
        self.entries.push(Savepoint {
            name: name.into(),
            position,
        });
        self.entries.len() - 1
    }

    /// Index of the most recent savepoint called `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().rposition(|sp| sp.name == name)
    }

    /// Remove the entry at `index` and everything above it
    pub fn pop_through(&mut self, index: usize) -> Vec<Savepoint> {
        if index >= self.entries.len() {
            return Vec::new();
        }
        self.entries.split_off(index)
    }

    /// Remove everything above `index`, keeping the entry itself
    pub fn pop_above(&mut self, index: usize) -> Vec<Savepoint> {
        self.pop_through(index + 1)
    }

    /// Drop savepoints anchored past `position`
    ///
    /// Used after a truncation stopped early so that every remaining
    /// savepoint still points into the live log.
    pub fn discard_beyond(&mut self, position: ChangePosition) -> usize {
        let keep = self
            .entries
            .iter()
            .position(|sp| sp.position > position)
            .unwrap_or(self.entries.len());
        self.entries.split_off(keep).len()
    }

    /// Undo every change made after savepoint `name` and drop the savepoints
    /// defined after it
    ///
    /// The savepoint itself stays on the stack, so it can be rolled back to
    /// again. Returns the number of changes undone.
    pub fn rollback_to<T, F>(
        &mut self,
        name: &str,
        log: &mut ChangeLog<T>,
        undo: F,
    ) -> Result<usize, SavepointError>
    where
        F: FnMut(&ChangeRecord<T>) -> Result<(), StorageFault>,
    {
        let index = self
            .find(name)
            .ok_or_else(|| SavepointError::NotFound(name.to_string()))?;
        let position = self.entries[index].position;

        match log.truncate_after(position, undo) {
            Ok(undone) => {
                self.pop_above(index);
                Ok(undone)
            }
            Err(failure) => {
                self.discard_beyond(log.current_position());
                Err(failure.into())
            }
        }
    }

    /// Discard savepoint `name` and every savepoint defined after it
    ///
    /// No change is undone.
    pub fn release(&mut self, name: &str) -> Result<Vec<Savepoint>, SavepointError> {
        let index = self
            .find(name)
            .ok_or_else(|| SavepointError::NotFound(name.to_string()))?;
        Ok(self.pop_through(index))
    }

    /// Savepoint names, oldest first
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|sp| sp.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Savepoint> {
        self.entries.iter()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
