//! Test utilities for txnscope integration tests
//!
//! - RecordingEngine: storage engine that records every call and can be
//!   told to fault on demand
//! - Logging setup shared by all test binaries

#![allow(dead_code)]

pub mod recording_engine;

use std::sync::Arc;

use recording_engine::RecordingEngine;
use txnscope::{TransactionConfig, TransactionController};

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Controller over a fresh recording engine
pub fn recording_controller(
    config: TransactionConfig,
) -> (Arc<RecordingEngine>, TransactionController<RecordingEngine>) {
    init_logging();
    let engine = Arc::new(RecordingEngine::new());
    let controller = TransactionController::new(Arc::clone(&engine), config);
    (engine, controller)
}
