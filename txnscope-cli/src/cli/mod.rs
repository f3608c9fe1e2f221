// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for txnscope
//!
//! Provides an interactive transaction shell (REPL) and a script runner
//! that drive one session over a reference storage engine.

pub mod commands;
pub mod output;
pub mod shell;
pub mod statement;

pub use commands::{Cli, Commands};
pub use shell::{handle_script, handle_shell, load_config};
