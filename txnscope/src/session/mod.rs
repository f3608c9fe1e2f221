// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session management
//!
//! This module provides the session-level home of the current transaction:
//! - Session-scoped transaction state with autocommit
//! - A registry of independent sessions sharing one storage engine

pub mod manager;
pub mod transaction_state;

pub use manager::{SessionHandle, SessionManager};
pub use transaction_state::SessionTransactionState;
