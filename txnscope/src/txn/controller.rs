// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction controller
//!
//! The state machine a session drives: `begin`, `savepoint`, `release`,
//! `rollback_to`, `commit`, `rollback`. It owns the live [`Transaction`]
//! (change log plus savepoint stack) and calls into the [`StorageEngine`]
//! to apply, undo and finalize changes.
//!
//! ```text
//!            begin                commit / rollback
//!   none ───────────▶ active ─────────────────────▶ committed | rolled_back
//!                      │  ▲                                  │
//!        undo fault    │  │ rollback_to                      │ begin
//!                      ▼  │                                  ▼
//!                     failed ──── rollback ────▶ rolled_back  active
//! ```

use std::sync::Arc;

use super::error::{TransactionError, TransactionResult, TxnOperation};
use super::log::{ChangePosition, ChangeRecord};
use super::savepoint::SavepointError;
use super::state::{Transaction, TransactionId, TransactionStatus};
use super::stats::{TransactionStatistics, TransactionSummary};
use crate::config::TransactionConfig;
use crate::storage::{StorageEngine, StorageFault};

/// Drives one session's transactions against a storage engine
///
/// A controller is confined to one session; callers that share it across
/// threads must wrap it in a lock (see [`crate::session::SessionManager`]).
pub struct TransactionController<E: StorageEngine + ?Sized> {
    engine: Arc<E>,
    config: TransactionConfig,
    current: Option<Transaction<E::UndoToken>>,
    /// State reported while no transaction is live
    outcome: TransactionStatus,
    stats: TransactionStatistics,
}

/// Undo one change through the engine, counting the invocation
fn undo_change<E: StorageEngine + ?Sized>(
    engine: &E,
    stats: &mut TransactionStatistics,
    txn_id: TransactionId,
    record: &ChangeRecord<E::UndoToken>,
) -> Result<(), StorageFault> {
    stats.undo_invocations += 1;
    log::debug!("{}: undoing change {}", txn_id, record.position);
    engine.undo(txn_id, &record.token)
}

impl<E: StorageEngine + ?Sized> TransactionController<E> {
    pub fn new(engine: Arc<E>, config: TransactionConfig) -> Self {
        Self {
            engine,
            config,
            current: None,
            outcome: TransactionStatus::None,
            stats: TransactionStatistics::default(),
        }
    }

    pub fn with_defaults(engine: Arc<E>) -> Self {
        Self::new(engine, TransactionConfig::default())
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Current lifecycle state
    ///
    /// After `commit`/`rollback` this reports `committed`/`rolled_back`
    /// until the next `begin`.
    pub fn state(&self) -> TransactionStatus {
        self.current
            .as_ref()
            .map(|txn| txn.status())
            .unwrap_or(self.outcome)
    }

    /// Whether a transaction is live (`active` or `failed`)
    pub fn in_transaction(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_transaction(&self) -> Option<&Transaction<E::UndoToken>> {
        self.current.as_ref()
    }

    pub fn summary(&self) -> TransactionSummary {
        match &self.current {
            Some(txn) => TransactionSummary::of(txn),
            None => TransactionSummary::idle(self.outcome),
        }
    }

    pub fn statistics(&self) -> &TransactionStatistics {
        &self.stats
    }

    /// Start a new transaction
    pub fn begin(&mut self) -> TransactionResult<TransactionId> {
        if let Some(txn) = &self.current {
            return Err(TransactionError::TransactionAlreadyActive {
                operation: TxnOperation::Begin,
                state: txn.status(),
            });
        }

        let txn = Transaction::begin();
        let id = txn.id();
        self.current = Some(txn);
        self.stats.begun += 1;
        log::info!("Transaction {} started", id);
        Ok(id)
    }

    /// Record the undo token of a change already applied by the engine
    pub fn record_change(&mut self, token: E::UndoToken) -> TransactionResult<ChangePosition> {
        let txn = self.active_mut(TxnOperation::RecordChange)?;
        let id = txn.id();
        let position = txn.change_log.append(token);
        self.stats.changes_recorded += 1;
        log::debug!("{}: recorded change {}", id, position);
        Ok(position)
    }

    /// Apply an operation through the engine and record its undo token
    ///
    /// A storage fault escalates the transaction to `failed`.
    pub fn apply(&mut self, operation: E::Operation) -> TransactionResult<ChangePosition> {
        let txn_id = self.active_mut(TxnOperation::Execute)?.id();
        match self.engine.apply(txn_id, operation) {
            Ok(token) => self.record_change(token),
            Err(fault) => {
                log::error!("{}: storage engine rejected change: {}", txn_id, fault);
                if let Some(txn) = self.current.as_mut() {
                    txn.fail(format!("apply failed: {}", fault));
                }
                Err(TransactionError::ApplyFault {
                    operation: TxnOperation::Execute,
                    state: TransactionStatus::Failed,
                    fault,
                })
            }
        }
    }

    /// Define a savepoint at the current change log position
    pub fn savepoint(&mut self, name: &str) -> TransactionResult<ChangePosition> {
        let allow_duplicates = self.config.allow_duplicate_savepoint_names;
        let limit = self.config.max_savepoint_depth;
        let txn = self.active_mut(TxnOperation::Savepoint)?;

        if !allow_duplicates && txn.savepoints.find(name).is_some() {
            return Err(TransactionError::DuplicateSavepoint {
                operation: TxnOperation::Savepoint,
                name: name.to_string(),
                state: TransactionStatus::Active,
            });
        }
        if let Some(limit) = limit {
            if txn.savepoints.depth() >= limit {
                return Err(TransactionError::SavepointLimitExceeded {
                    operation: TxnOperation::Savepoint,
                    limit,
                    state: TransactionStatus::Active,
                });
            }
        }

        let id = txn.id();
        let position = txn.change_log.current_position();
        txn.savepoints.push(name, position);
        self.stats.savepoints_created += 1;
        log::info!("{}: savepoint '{}' at {}", id, name, position);
        Ok(position)
    }

    /// Discard savepoint `name` and every later savepoint without undoing
    /// anything; returns how many savepoints were removed
    pub fn release(&mut self, name: &str) -> TransactionResult<usize> {
        let txn = self.active_mut(TxnOperation::Release)?;
        let id = txn.id();
        let released = txn
            .savepoints
            .release(name)
            .map_err(|_| TransactionError::UnknownSavepoint {
                operation: TxnOperation::Release,
                name: name.to_string(),
                state: TransactionStatus::Active,
            })?;
        log::info!(
            "{}: released savepoint '{}' ({} removed)",
            id,
            name,
            released.len()
        );
        Ok(released.len())
    }

    /// Undo every change made after savepoint `name`
    ///
    /// Valid from `active` and `failed`; a successful rollback from `failed`
    /// returns the transaction to `active`. Returns the number of changes
    /// undone.
    pub fn rollback_to(&mut self, name: &str) -> TransactionResult<usize> {
        let outcome = self.outcome;
        let engine = &*self.engine;
        let stats = &mut self.stats;
        let txn = self
            .current
            .as_mut()
            .ok_or(TransactionError::NoActiveTransaction {
                operation: TxnOperation::RollbackTo,
                state: outcome,
            })?;
        let id = txn.id();
        let was_failed = txn.status() == TransactionStatus::Failed;

        let result = txn
            .savepoints
            .rollback_to(name, &mut txn.change_log, |record| {
                undo_change(engine, stats, id, record)
            });

        match result {
            Ok(undone) => {
                if was_failed {
                    txn.recover();
                    log::info!("{}: recovered from failure via savepoint '{}'", id, name);
                }
                log::info!(
                    "{}: rolled back to savepoint '{}' ({} change(s) undone)",
                    id,
                    name,
                    undone
                );
                Ok(undone)
            }
            Err(SavepointError::NotFound(_)) => Err(TransactionError::UnknownSavepoint {
                operation: TxnOperation::RollbackTo,
                name: name.to_string(),
                state: txn.status(),
            }),
            Err(SavepointError::Undo(failure)) => {
                log::error!(
                    "{}: undo of change {} failed during rollback to '{}': {}",
                    id,
                    failure.position,
                    name,
                    failure.fault
                );
                txn.fail(format!(
                    "undo of change {} failed: {}",
                    failure.position, failure.fault
                ));
                Err(TransactionError::UndoFault {
                    operation: TxnOperation::RollbackTo,
                    position: failure.position,
                    state: TransactionStatus::Failed,
                    fault: failure.fault,
                })
            }
        }
    }

    /// Finalize every recorded change through the engine
    ///
    /// A transaction with no changes commits without calling `finalize`.
    /// If finalization fails the transaction is fully undone, ends in
    /// `rolled_back`, and `CommitFailed` is returned.
    pub fn commit(&mut self) -> TransactionResult<TransactionId> {
        self.active_mut(TxnOperation::Commit)?;
        let Some(mut txn) = self.current.take() else {
            return Err(self.no_transaction(TxnOperation::Commit));
        };
        let id = txn.id();

        if txn.change_log.is_empty() {
            self.finish(TransactionStatus::Committed);
            log::info!("Transaction {} committed (no changes)", id);
            return Ok(id);
        }

        let fault = match self.engine.finalize(id, txn.change_log.records()) {
            Ok(()) => {
                self.finish(TransactionStatus::Committed);
                log::info!(
                    "Transaction {} committed ({} change(s))",
                    id,
                    txn.change_log.len()
                );
                return Ok(id);
            }
            Err(fault) => fault,
        };

        log::warn!("Transaction {} commit failed, rolling back: {}", id, fault);
        let engine = &*self.engine;
        let stats = &mut self.stats;
        let undo = txn
            .change_log
            .truncate_after(ChangePosition::EMPTY, |record| {
                undo_change(engine, stats, id, record)
            });
        if let Err(failure) = &undo {
            log::error!(
                "Transaction {} rollback after failed commit incomplete at change {}: {}",
                id,
                failure.position,
                failure.fault
            );
        }
        self.stats.commit_failures += 1;
        self.finish(TransactionStatus::RolledBack);

        Err(TransactionError::CommitFailed {
            operation: TxnOperation::Commit,
            rollback_complete: undo.is_ok(),
            state: TransactionStatus::RolledBack,
            fault,
        })
    }

    /// Undo every change and end the transaction
    ///
    /// Valid from `active` and `failed`. An undo fault still ends the
    /// transaction in `rolled_back` and is reported as `RollbackIncomplete`.
    pub fn rollback(&mut self) -> TransactionResult<usize> {
        let Some(mut txn) = self.current.take() else {
            return Err(self.no_transaction(TxnOperation::Rollback));
        };
        let id = txn.id();

        let engine = &*self.engine;
        let stats = &mut self.stats;
        let result = txn
            .change_log
            .truncate_after(ChangePosition::EMPTY, |record| {
                undo_change(engine, stats, id, record)
            });
        self.finish(TransactionStatus::RolledBack);

        match result {
            Ok(undone) => {
                log::info!(
                    "Transaction {} rolled back ({} change(s) undone)",
                    id,
                    undone
                );
                Ok(undone)
            }
            Err(failure) => {
                log::error!(
                    "Transaction {} rollback incomplete: undo of change {} failed: {}",
                    id,
                    failure.position,
                    failure.fault
                );
                Err(TransactionError::RollbackIncomplete {
                    operation: TxnOperation::Rollback,
                    position: failure.position,
                    state: TransactionStatus::RolledBack,
                    fault: failure.fault,
                })
            }
        }
    }

    /// Force the live transaction into `failed`
    ///
    /// A transaction that already failed keeps its original reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> TransactionResult<()> {
        let Some(txn) = self.current.as_mut() else {
            return Err(self.no_transaction(TxnOperation::MarkFailed));
        };
        if txn.status() == TransactionStatus::Active {
            let reason = reason.into();
            log::warn!("Transaction {} marked failed: {}", txn.id(), reason);
            txn.fail(reason);
        }
        Ok(())
    }

    fn active_mut(
        &mut self,
        operation: TxnOperation,
    ) -> TransactionResult<&mut Transaction<E::UndoToken>> {
        let state = self.state();
        match self.current.as_mut() {
            Some(txn) if txn.status() == TransactionStatus::Active => Ok(txn),
            _ => Err(TransactionError::NoActiveTransaction { operation, state }),
        }
    }

    fn no_transaction(&self, operation: TxnOperation) -> TransactionError {
        TransactionError::NoActiveTransaction {
            operation,
            state: self.state(),
        }
    }

    fn finish(&mut self, outcome: TransactionStatus) {
        self.current = None;
        self.outcome = outcome;
        match outcome {
            TransactionStatus::Committed => self.stats.committed += 1,
            TransactionStatus::RolledBack => self.stats.rolled_back += 1,
            _ => {}
        }
    }
}

impl<E: StorageEngine + ?Sized> std::fmt::Debug for TransactionController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionController")
            .field("state", &self.state())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}
