// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use txnscope::EngineType;

/// txnscope - explore nested transactions and savepoints
#[derive(Parser, Debug)]
#[command(name = "txnscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Transaction configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Require explicit BEGIN before changes
    #[arg(long, global = true)]
    pub no_auto_commit: bool,

    /// Output format for STATUS, STATS, GET and SCAN
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive transaction shell
    Shell {
        /// Storage engine backing the session
        #[arg(long, default_value = "memory")]
        engine: EngineType,

        /// Database directory for persistent engines
        #[arg(long, default_value = "./txnscope-data")]
        path: PathBuf,
    },

    /// Run a file of shell commands
    Script {
        /// Command file, one command per line
        file: PathBuf,

        /// Storage engine backing the session
        #[arg(long, default_value = "memory")]
        engine: EngineType,

        /// Database directory for persistent engines
        #[arg(long, default_value = "./txnscope-data")]
        path: PathBuf,

        /// Continue after a failing command instead of stopping
        #[arg(long)]
        keep_going: bool,
    },

    /// Show version information
    Version,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}
