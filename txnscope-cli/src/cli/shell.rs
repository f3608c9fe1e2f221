// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Interactive shell and script runner

use colored::Colorize;
use rustyline::{error::ReadlineError, CompletionType, Config, EditMode, Editor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use txnscope::{
    create_engine, EngineType, KeyValueEngine, KvOperation, SessionTransactionState,
    TransactionConfig,
};

use super::commands::OutputFormat;
use super::output::{Response, ResultFormatter};
use super::statement::{parse_statement, Statement};

/// One session driven by shell commands
pub struct Shell {
    session: SessionTransactionState<dyn KeyValueEngine>,
}

impl Shell {
    pub fn new(engine: Arc<dyn KeyValueEngine>, config: TransactionConfig) -> Self {
        Self {
            session: SessionTransactionState::new(engine, config),
        }
    }

    pub fn session(&self) -> &SessionTransactionState<dyn KeyValueEngine> {
        &self.session
    }

    /// Parse and run one line; blank and comment lines yield `Ok(None)`
    pub fn run_line(&mut self, line: &str) -> Result<Option<Response>, Box<dyn std::error::Error>> {
        match parse_statement(line)? {
            Some(statement) => Ok(Some(self.execute(statement)?)),
            None => Ok(None),
        }
    }

    pub fn execute(&mut self, statement: Statement) -> Result<Response, Box<dyn std::error::Error>> {
        let response = match statement {
            Statement::Begin => {
                let id = self.session.begin_transaction()?;
                Response::Message(format!("Transaction {} started", id))
            }
            Statement::Commit => {
                let id = self.session.commit_transaction()?;
                Response::Message(format!("Transaction {} committed", id))
            }
            Statement::Rollback => {
                let undone = self.session.rollback_transaction()?;
                Response::Message(format!("Rolled back ({} change(s) undone)", undone))
            }
            Statement::Savepoint(name) => {
                let position = self.session.savepoint(&name)?;
                Response::Message(format!("Savepoint {} defined at {}", name, position))
            }
            Statement::Release(name) => {
                let released = self.session.release_savepoint(&name)?;
                Response::Message(format!(
                    "Released savepoint {} ({} removed)",
                    name, released
                ))
            }
            Statement::RollbackTo(name) => {
                let undone = self.session.rollback_to_savepoint(&name)?;
                Response::Message(format!(
                    "Rolled back to savepoint {} ({} change(s) undone)",
                    name, undone
                ))
            }
            Statement::Put { key, value } => {
                self.session.execute(KvOperation::put(key.clone(), value))?;
                Response::Message(format!("PUT {}", key))
            }
            Statement::Delete(key) => {
                self.session.execute(KvOperation::delete(key.clone()))?;
                Response::Message(format!("DELETE {}", key))
            }
            Statement::Get(key) => {
                let value = self
                    .session
                    .engine()
                    .get(key.as_bytes())?
                    .map(|v| String::from_utf8_lossy(&v).into_owned());
                Response::Value { key, value }
            }
            Statement::Scan => {
                let rows = self
                    .session
                    .engine()
                    .scan()?
                    .into_iter()
                    .map(|(k, v)| {
                        (
                            String::from_utf8_lossy(&k).into_owned(),
                            String::from_utf8_lossy(&v).into_owned(),
                        )
                    })
                    .collect();
                Response::Rows(rows)
            }
            Statement::Status => Response::Status(self.session.summary()),
            Statement::Stats => Response::Stats(self.session.statistics().clone()),
            Statement::Help => Response::Help,
            Statement::Exit => Response::Exit,
        };
        Ok(response)
    }

    /// Roll back a transaction left open at the end of a session
    fn finish(&mut self) {
        if self.session.has_active_transaction() {
            log::warn!("Rolling back transaction left open at exit");
            if let Err(e) = self.session.rollback_transaction() {
                eprintln!("{}", format!("Error: {}", e).red());
            }
        }
    }
}

/// Build the session configuration from the global flags
pub fn load_config(
    path: Option<&Path>,
    no_auto_commit: bool,
) -> Result<TransactionConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => TransactionConfig::from_file(path)?,
        None => TransactionConfig::default(),
    };
    if no_auto_commit {
        config.auto_commit = false;
    }
    Ok(config)
}

/// Start the interactive shell
pub fn handle_shell(
    engine_type: EngineType,
    path: PathBuf,
    config: TransactionConfig,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = create_engine(engine_type, &path)?;
    let mut shell = Shell::new(engine, config);

    println!("{}", "txnscope".bold().green());
    println!("Type 'help' for commands, 'exit' or 'quit' to exit\n");
    println!("Engine: {}", engine_type);
    println!("Session ID: {}", shell.session().session_id());

    let rl_config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();

    let mut rl = Editor::<(), _>::with_config(rl_config)?;

    let history_path = ".txnscope/.shell_history.txt";
    if let Some(parent) = Path::new(&history_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.load_history(&history_path);

    loop {
        let prompt = format!("{}> ", shell.session().state().to_string().cyan());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str())?;

        match shell.run_line(&line) {
            Ok(Some(Response::Exit)) => {
                println!("{}", ResultFormatter::format(&Response::Exit, format));
                break;
            }
            Ok(Some(response)) => println!("{}", ResultFormatter::format(&response, format)),
            Ok(None) => {}
            Err(e) => eprintln!("{}", ResultFormatter::format_error(e.as_ref(), format)),
        }
    }

    shell.finish();
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Run a command file
pub fn handle_script(
    file: PathBuf,
    engine_type: EngineType,
    path: PathBuf,
    config: TransactionConfig,
    format: OutputFormat,
    keep_going: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let script = std::fs::read_to_string(&file)
        .map_err(|e| format!("Failed to read script {:?}: {}", file, e))?;
    let engine = create_engine(engine_type, &path)?;
    let mut shell = Shell::new(engine, config);

    let failures = run_script(&mut shell, &script, format, keep_going);
    shell.finish();

    if failures > 0 {
        return Err(format!("{} command(s) failed", failures).into());
    }
    Ok(())
}

/// Execute script lines, printing each response; returns the failure count
fn run_script(shell: &mut Shell, script: &str, format: OutputFormat, keep_going: bool) -> usize {
    let mut failures = 0;
    for (index, line) in script.lines().enumerate() {
        match shell.run_line(line) {
            Ok(Some(Response::Exit)) => break,
            Ok(Some(response)) => println!("{}", ResultFormatter::format(&response, format)),
            Ok(None) => {}
            Err(e) => {
                failures += 1;
                eprintln!(
                    "line {}: {}",
                    index + 1,
                    ResultFormatter::format_error(e.as_ref(), format)
                );
                if !keep_going {
                    break;
                }
            }
        }
    }
    failures
}
