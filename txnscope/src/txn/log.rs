// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction change log for rollback support
//!
//! Every change a transaction makes is recorded here together with the undo
//! token the storage engine handed back for it. Truncating the log undoes
//! the removed changes, most recent first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageFault;

/// Sequence position of a change within its transaction
///
/// The k-th live record sits at position k; [`ChangePosition::EMPTY`]
/// is the position of an empty log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangePosition(u64);

impl ChangePosition {
    /// Position of a log with no records
    pub const EMPTY: ChangePosition = ChangePosition(0);

    pub fn new(value: u64) -> Self {
        ChangePosition(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl std::fmt::Display for ChangePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One undoable unit of change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord<T> {
    pub position: ChangePosition,
    pub token: T,
}

/// An undo action failed while the log was being truncated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Undo of change {position} failed after {undone} successful undo(s)")]
pub struct UndoFailure {
    /// Position of the record whose undo faulted; it is still in the log
    pub position: ChangePosition,
    /// Number of records undone before the fault
    pub undone: usize,
    #[source]
    pub fault: StorageFault,
}

/// Append-only (until truncated) log of a transaction's changes
#[derive(Debug, Clone)]
pub struct ChangeLog<T> {
    records: Vec<ChangeRecord<T>>,
}

impl<T> Default for ChangeLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChangeLog<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Record a change at the next position
    pub fn append(&mut self, token: T) -> ChangePosition {
        let position = ChangePosition(self.records.len() as u64 + 1);
        self.records.push(ChangeRecord { position, token });
        position
    }

    /// Position of the most recent record, or `EMPTY`
    pub fn current_position(&self) -> ChangePosition {
        self.records
            .last()
            .map(|record| record.position)
            .unwrap_or(ChangePosition::EMPTY)
    }

    /// Remove every record after `position`, undoing each one newest first
    ///
    /// Stops at the first undo that faults; that record stays in the log so
    /// `current_position()` afterwards is its position. Returns the number
    /// of records undone.
    pub fn truncate_after<F>(&mut self, position: ChangePosition, mut undo: F) -> Result<usize, UndoFailure>
    where
        F: FnMut(&ChangeRecord<T>) -> Result<(), StorageFault>,
    {
        let mut undone = 0;
        while let Some(record) = self.records.last() {
            if record.position <= position {
                break;
            }
            if let Err(fault) = undo(record) {
                return Err(UndoFailure {
                    position: record.position,
                    undone,
                    fault,
                });
            }
            self.records.pop();
            undone += 1;
        }
        Ok(undone)
    }

    /// Records in creation order
    pub fn records(&self) -> &[ChangeRecord<T>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_log_creation() {
        let log: ChangeLog<&str> = ChangeLog::new();
        assert!(log.is_empty());
        assert_eq!(log.current_position(), ChangePosition::EMPTY);
    }

    #[test]
    fn test_append_assigns_increasing_positions() {
        let mut log = ChangeLog::new();
        let p1 = log.append("t1");
        let p2 = log.append("t2");
        assert!(p2 > p1);
        assert_eq!(log.current_position(), p2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_truncate_undoes_in_reverse_order() {
        let mut log = ChangeLog::new();
        for token in ["t1", "t2", "t3", "t4"] {
            log.append(token);
        }

        let mut undone = Vec::new();
        let count = log
            .truncate_after(ChangePosition::new(1), |record| {
                undone.push((record.position.value(), record.token));
                Ok(())
            })
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(undone, vec![(4, "t4"), (3, "t3"), (2, "t2")]);
        assert_eq!(log.current_position(), ChangePosition::new(1));
    }

    #[test]
    fn test_truncate_to_empty() {
        let mut log = ChangeLog::new();
        log.append(1);
        log.append(2);

        let mut calls = 0;
        log.truncate_after(ChangePosition::EMPTY, |_| {
            calls += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert!(log.is_empty());
        // Positions restart after the truncation point
        assert_eq!(log.append(3), ChangePosition::new(1));
    }

    #[test]
    fn test_truncate_to_current_position_is_noop() {
        let mut log = ChangeLog::new();
        let p = log.append("t1");
        let count = log
            .truncate_after(p, |_| panic!("nothing should be undone"))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(log.current_position(), p);
    }

    #[test]
    fn test_truncate_stops_at_first_fault() {
        let mut log = ChangeLog::new();
        for token in ["t1", "t2", "t3", "t4"] {
            log.append(token);
        }

        let mut undone = Vec::new();
        let failure = log
            .truncate_after(ChangePosition::EMPTY, |record| {
                if record.token == "t2" {
                    return Err(StorageFault::Constraint("t2 is pinned".to_string()));
                }
                undone.push(record.token);
                Ok(())
            })
            .unwrap_err();

        assert_eq!(undone, vec!["t4", "t3"]);
        assert_eq!(failure.position, ChangePosition::new(2));
        assert_eq!(failure.undone, 2);
        // The record whose undo faulted is still in the log
        assert_eq!(log.current_position(), ChangePosition::new(2));
    }
}
