// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! txnscope CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Default to Warn (can still be overridden by RUST_LOG env var)
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::Version => {
            println!("{} {}", "txnscope".bold().green(), txnscope::VERSION);
            println!("Nested transaction and savepoint manager");
            Ok(())
        }

        Commands::Shell { engine, path } => {
            let config = cli::load_config(cli.config.as_deref(), cli.no_auto_commit)?;
            cli::handle_shell(engine, path, config, cli.format)
        }

        Commands::Script {
            file,
            engine,
            path,
            keep_going,
        } => {
            let config = cli::load_config(cli.config.as_deref(), cli.no_auto_commit)?;
            cli::handle_script(file, engine, path, config, cli.format, keep_going)
        }
    }
}
