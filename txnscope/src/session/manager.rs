// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session registry
//!
//! Sessions are looked up by ID. Each session sits behind its own mutex so
//! at most one operation is in flight per transaction, while different
//! sessions proceed in parallel.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use super::transaction_state::SessionTransactionState;
use crate::config::TransactionConfig;
use crate::storage::StorageEngine;
use crate::txn::{TransactionResult, TransactionStatistics};

/// Shared handle to one session
pub type SessionHandle<E> = Arc<Mutex<SessionTransactionState<E>>>;

/// Session manager that maintains all open sessions over one engine
pub struct SessionManager<E: StorageEngine + ?Sized> {
    /// Storage engine shared by every session
    engine: Arc<E>,
    /// Configuration handed to new sessions
    default_config: TransactionConfig,
    /// Registry of open sessions indexed by session_id
    sessions: RwLock<HashMap<String, SessionHandle<E>>>,
    /// Counters carried over from sessions already closed
    closed_stats: Mutex<TransactionStatistics>,
}

impl<E: StorageEngine + ?Sized> SessionManager<E> {
    pub fn new(engine: Arc<E>, default_config: TransactionConfig) -> Self {
        Self {
            engine,
            default_config,
            sessions: RwLock::new(HashMap::new()),
            closed_stats: Mutex::new(TransactionStatistics::default()),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Create a new session with the default configuration and return its ID
    pub fn create_session(&self) -> String {
        self.create_session_with_config(self.default_config.clone())
    }

    pub fn create_session_with_config(&self, config: TransactionConfig) -> String {
        let session = SessionTransactionState::new(Arc::clone(&self.engine), config);
        let session_id = session.session_id().to_string();
        self.sessions
            .write()
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));
        log::info!("Session {} created", session_id);
        session_id
    }

    /// Get a session by ID
    pub fn get_session(&self, session_id: &str) -> Option<SessionHandle<E>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Remove a session from the registry, rolling back its live transaction
    ///
    /// Returns `Ok(false)` when no session has that ID. The session is
    /// removed even if the rollback reports an error.
    pub fn close_session(&self, session_id: &str) -> TransactionResult<bool> {
        let Some(handle) = self.sessions.write().remove(session_id) else {
            return Ok(false);
        };

        let mut session = handle.lock();
        let result = session.abandon();
        self.closed_stats.lock().merge(session.statistics());
        log::info!("Session {} closed", session_id);
        result.map(|_| true)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Counters aggregated over open and closed sessions
    pub fn statistics(&self) -> TransactionStatistics {
        let mut total = self.closed_stats.lock().clone();
        let handles: Vec<SessionHandle<E>> = self.sessions.read().values().cloned().collect();
        for handle in handles {
            total.merge(handle.lock().statistics());
        }
        total
    }
}
