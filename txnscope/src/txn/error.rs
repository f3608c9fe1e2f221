// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::log::ChangePosition;
use super::state::TransactionStatus;
use crate::storage::StorageFault;

/// Operation exposed by the transaction controller and session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnOperation {
    Begin,
    RecordChange,
    Execute,
    Savepoint,
    Release,
    RollbackTo,
    Commit,
    Rollback,
    MarkFailed,
}

impl std::fmt::Display for TxnOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TxnOperation::Begin => "begin",
            TxnOperation::RecordChange => "record_change",
            TxnOperation::Execute => "execute",
            TxnOperation::Savepoint => "savepoint",
            TxnOperation::Release => "release",
            TxnOperation::RollbackTo => "rollback_to",
            TxnOperation::Commit => "commit",
            TxnOperation::Rollback => "rollback",
            TxnOperation::MarkFailed => "mark_failed",
        };
        f.write_str(name)
    }
}

/// Errors signalled by the transaction controller
///
/// Every variant names the operation that failed and the state the
/// transaction is in afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("{operation}: a transaction is already active (state: {state})")]
    TransactionAlreadyActive {
        operation: TxnOperation,
        state: TransactionStatus,
    },

    #[error("{operation}: no active transaction (state: {state})")]
    NoActiveTransaction {
        operation: TxnOperation,
        state: TransactionStatus,
    },

    #[error("{operation}: savepoint not found: {name} (state: {state})")]
    UnknownSavepoint {
        operation: TxnOperation,
        name: String,
        state: TransactionStatus,
    },

    #[error("{operation}: savepoint already exists: {name} (state: {state})")]
    DuplicateSavepoint {
        operation: TxnOperation,
        name: String,
        state: TransactionStatus,
    },

    #[error("{operation}: savepoint limit exceeded: limit {limit} (state: {state})")]
    SavepointLimitExceeded {
        operation: TxnOperation,
        limit: usize,
        state: TransactionStatus,
    },

    #[error("{operation}: storage engine rejected the change (state: {state})")]
    ApplyFault {
        operation: TxnOperation,
        state: TransactionStatus,
        #[source]
        fault: StorageFault,
    },

    #[error("{operation}: undo of change {position} failed (state: {state})")]
    UndoFault {
        operation: TxnOperation,
        position: ChangePosition,
        state: TransactionStatus,
        #[source]
        fault: StorageFault,
    },

    #[error("{operation}: commit failed, rollback complete: {rollback_complete} (state: {state})")]
    CommitFailed {
        operation: TxnOperation,
        rollback_complete: bool,
        state: TransactionStatus,
        #[source]
        fault: StorageFault,
    },

    #[error("{operation}: rollback incomplete, undo of change {position} failed (state: {state})")]
    RollbackIncomplete {
        operation: TxnOperation,
        position: ChangePosition,
        state: TransactionStatus,
        #[source]
        fault: StorageFault,
    },
}

impl TransactionError {
    /// The operation that signalled the error
    pub fn operation(&self) -> TxnOperation {
        match self {
            TransactionError::TransactionAlreadyActive { operation, .. }
            | TransactionError::NoActiveTransaction { operation, .. }
            | TransactionError::UnknownSavepoint { operation, .. }
            | TransactionError::DuplicateSavepoint { operation, .. }
            | TransactionError::SavepointLimitExceeded { operation, .. }
            | TransactionError::ApplyFault { operation, .. }
            | TransactionError::UndoFault { operation, .. }
            | TransactionError::CommitFailed { operation, .. }
            | TransactionError::RollbackIncomplete { operation, .. } => *operation,
        }
    }

    /// The transaction state after the error
    pub fn state(&self) -> TransactionStatus {
        match self {
            TransactionError::TransactionAlreadyActive { state, .. }
            | TransactionError::NoActiveTransaction { state, .. }
            | TransactionError::UnknownSavepoint { state, .. }
            | TransactionError::DuplicateSavepoint { state, .. }
            | TransactionError::SavepointLimitExceeded { state, .. }
            | TransactionError::ApplyFault { state, .. }
            | TransactionError::UndoFault { state, .. }
            | TransactionError::CommitFailed { state, .. }
            | TransactionError::RollbackIncomplete { state, .. } => *state,
        }
    }

    /// Data-level fault; the transaction must be discarded
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionError::ApplyFault { .. }
                | TransactionError::UndoFault { .. }
                | TransactionError::CommitFailed { .. }
                | TransactionError::RollbackIncomplete { .. }
        )
    }

    /// Structural misuse; the transaction is unchanged and the caller may
    /// retry with corrected arguments
    pub fn is_retryable(&self) -> bool {
        !self.is_terminal()
    }

    /// Replace the reported state, used when the session layer ends an
    /// implicit transaction after the error was raised
    pub(crate) fn with_state(mut self, new_state: TransactionStatus) -> Self {
        match &mut self {
            TransactionError::TransactionAlreadyActive { state, .. }
            | TransactionError::NoActiveTransaction { state, .. }
            | TransactionError::UnknownSavepoint { state, .. }
            | TransactionError::DuplicateSavepoint { state, .. }
            | TransactionError::SavepointLimitExceeded { state, .. }
            | TransactionError::ApplyFault { state, .. }
            | TransactionError::UndoFault { state, .. }
            | TransactionError::CommitFailed { state, .. }
            | TransactionError::RollbackIncomplete { state, .. } => *state = new_state,
        }
        self
    }

    /// The storage fault behind a data-level error
    pub fn fault(&self) -> Option<&StorageFault> {
        match self {
            TransactionError::ApplyFault { fault, .. }
            | TransactionError::UndoFault { fault, .. }
            | TransactionError::CommitFailed { fault, .. }
            | TransactionError::RollbackIncomplete { fault, .. } => Some(fault),
            _ => None,
        }
    }
}

/// Result type for transaction operations
pub type TransactionResult<T> = Result<T, TransactionError>;
