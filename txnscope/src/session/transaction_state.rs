// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session-scoped transaction state management
//!
//! A session owns its current transaction explicitly through a
//! [`TransactionController`]; there is no ambient "current transaction".
//! Outside an explicit transaction, operations run in implicit
//! single-operation transactions when autocommit is on.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::TransactionConfig;
use crate::storage::StorageEngine;
use crate::txn::{
    ChangePosition, TransactionController, TransactionId, TransactionResult, TransactionStatistics,
    TransactionStatus, TransactionSummary,
};

/// Session-scoped transaction state
pub struct SessionTransactionState<E: StorageEngine + ?Sized> {
    session_id: String,
    controller: TransactionController<E>,
    auto_commit: bool,
}

impl<E: StorageEngine + ?Sized> SessionTransactionState<E> {
    /// Create a new session transaction state
    pub fn new(engine: Arc<E>, config: TransactionConfig) -> Self {
        let auto_commit = config.auto_commit;
        Self {
            session_id: Uuid::new_v4().to_string(),
            controller: TransactionController::new(engine, config),
            auto_commit,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn engine(&self) -> &Arc<E> {
        self.controller.engine()
    }

    pub fn controller(&self) -> &TransactionController<E> {
        &self.controller
    }

    /// Check if auto-commit is enabled
    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Set auto-commit mode
    pub fn set_auto_commit(&mut self, enabled: bool) {
        self.auto_commit = enabled;
    }

    pub fn state(&self) -> TransactionStatus {
        self.controller.state()
    }

    /// Check if an explicit transaction is live
    pub fn has_active_transaction(&self) -> bool {
        self.controller.in_transaction()
    }

    pub fn current_transaction_id(&self) -> Option<TransactionId> {
        self.controller.current_transaction().map(|txn| txn.id())
    }

    pub fn summary(&self) -> TransactionSummary {
        self.controller.summary()
    }

    pub fn statistics(&self) -> &TransactionStatistics {
        self.controller.statistics()
    }

    /// Begin a new transaction
    pub fn begin_transaction(&mut self) -> TransactionResult<TransactionId> {
        let txn_id = self.controller.begin()?;
        log::debug!("Session {} began transaction {}", self.session_id, txn_id);
        Ok(txn_id)
    }

    /// Commit the current transaction
    pub fn commit_transaction(&mut self) -> TransactionResult<TransactionId> {
        let txn_id = self.controller.commit()?;
        log::debug!("Session {} committed transaction {}", self.session_id, txn_id);
        Ok(txn_id)
    }

    /// Rollback the current transaction
    pub fn rollback_transaction(&mut self) -> TransactionResult<usize> {
        self.controller.rollback()
    }

    pub fn savepoint(&mut self, name: &str) -> TransactionResult<ChangePosition> {
        self.controller.savepoint(name)
    }

    pub fn release_savepoint(&mut self, name: &str) -> TransactionResult<usize> {
        self.controller.release(name)
    }

    pub fn rollback_to_savepoint(&mut self, name: &str) -> TransactionResult<usize> {
        self.controller.rollback_to(name)
    }

    /// Apply one operation and record its undo token
    ///
    /// Inside an explicit transaction a storage fault leaves the transaction
    /// `failed`. Without one, the operation runs in an implicit transaction
    /// when autocommit is on.
    pub fn execute(&mut self, operation: E::Operation) -> TransactionResult<ChangePosition> {
        self.execute_with_auto_commit(move |controller| controller.apply(operation))
    }

    /// Execute a function with auto-commit handling
    ///
    /// With autocommit on and no live transaction, `f` runs inside an
    /// implicit transaction that is committed on success and rolled back on
    /// error. Otherwise `f` runs against the current state as is.
    pub fn execute_with_auto_commit<F, R>(&mut self, f: F) -> TransactionResult<R>
    where
        F: FnOnce(&mut TransactionController<E>) -> TransactionResult<R>,
    {
        let needs_auto_commit = self.auto_commit && !self.controller.in_transaction();
        if !needs_auto_commit {
            return f(&mut self.controller);
        }

        let txn_id = self.controller.begin()?;
        match f(&mut self.controller) {
            Ok(result) => {
                self.controller.commit()?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = self.controller.rollback() {
                    log::error!(
                        "Failed to rollback implicit transaction {} after error ({}): {}",
                        txn_id,
                        e,
                        rollback_err
                    );
                    return Err(rollback_err);
                }
                Err(e.with_state(self.controller.state()))
            }
        }
    }

    /// Roll back a live transaction, if any; used when a session is closed
    pub(crate) fn abandon(&mut self) -> TransactionResult<()> {
        if !self.controller.in_transaction() {
            return Ok(());
        }
        log::warn!(
            "Session {} closed with a live transaction; rolling back",
            self.session_id
        );
        self.controller.rollback().map(|_| ())
    }
}

impl<E: StorageEngine + ?Sized> std::fmt::Debug for SessionTransactionState<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTransactionState")
            .field("session_id", &self.session_id)
            .field("auto_commit", &self.auto_commit)
            .field("controller", &self.controller)
            .finish()
    }
}
