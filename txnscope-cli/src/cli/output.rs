// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use txnscope::{TransactionStatistics, TransactionStatus, TransactionSummary};

use super::commands::OutputFormat;

/// Result of one shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Acknowledgement of a transaction-control or write command
    Message(String),
    /// Value read by GET
    Value { key: String, value: Option<String> },
    /// Key-value pairs read by SCAN
    Rows(Vec<(String, String)>),
    Status(TransactionSummary),
    Stats(TransactionStatistics),
    Help,
    Exit,
}

/// Result formatter for different output formats
pub struct ResultFormatter;

impl ResultFormatter {
    /// Format a response in the specified format
    pub fn format(response: &Response, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(response),
            OutputFormat::Json => Self::format_json(response),
        }
    }

    /// Format a response for a terminal using comfy-table
    fn format_table(response: &Response) -> String {
        match response {
            Response::Message(msg) => format!("{}", format!("✅ {}", msg).green()),
            Response::Value { key, value } => match value {
                Some(value) => format!("{} = {}", key.cyan(), value),
                None => format!("{}", format!("{} is not set", key).yellow()),
            },
            Response::Rows(rows) => {
                if rows.is_empty() {
                    return format!("{}", "No keys found".yellow());
                }
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec![
                    Cell::new("key").fg(Color::Green),
                    Cell::new("value").fg(Color::Green),
                ]);
                for (key, value) in rows {
                    table.add_row(vec![key.as_str(), value.as_str()]);
                }
                format!("{}\nKeys returned: {}", table, rows.len())
            }
            Response::Status(summary) => Self::status_table(summary),
            Response::Stats(stats) => Self::stats_table(stats),
            Response::Help => help_text(),
            Response::Exit => format!("{}", "Goodbye!".green()),
        }
    }

    fn status_table(summary: &TransactionSummary) -> String {
        let mut output = format!(
            "Transaction state: {}\n",
            Self::colored_status(summary.status)
        );
        if let Some(id) = summary.transaction_id {
            output.push_str(&format!("Transaction: txn_{}\n", id));
            output.push_str(&format!("Changes recorded: {}\n", summary.change_count));
        }
        if let Some(elapsed) = summary.elapsed_ms {
            output.push_str(&format!("Elapsed: {} ms\n", elapsed));
        }
        if let Some(reason) = &summary.failure {
            output.push_str(&format!("{} {}\n", "Failure:".bold().red(), reason));
        }

        if !summary.savepoints.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                Cell::new("#").fg(Color::Green),
                Cell::new("savepoint").fg(Color::Green),
                Cell::new("position").fg(Color::Green),
            ]);
            for (depth, savepoint) in summary.savepoints.iter().enumerate() {
                table.add_row(vec![
                    (depth + 1).to_string(),
                    savepoint.name.clone(),
                    savepoint.position.to_string(),
                ]);
            }
            output.push_str(&table.to_string());
            output.push('\n');
        }
        output
    }

    fn stats_table(stats: &TransactionStatistics) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("counter").fg(Color::Green),
            Cell::new("value").fg(Color::Green),
        ]);
        let rows = [
            ("begun", stats.begun),
            ("committed", stats.committed),
            ("rolled back", stats.rolled_back),
            ("commit failures", stats.commit_failures),
            ("changes recorded", stats.changes_recorded),
            ("savepoints created", stats.savepoints_created),
            ("undo invocations", stats.undo_invocations),
        ];
        for (name, value) in rows {
            table.add_row(vec![name.to_string(), value.to_string()]);
        }
        table.to_string()
    }

    fn colored_status(status: TransactionStatus) -> ColoredString {
        match status {
            TransactionStatus::Active => status.as_str().green(),
            TransactionStatus::Failed => status.as_str().red().bold(),
            TransactionStatus::Committed => status.as_str().cyan(),
            TransactionStatus::RolledBack => status.as_str().yellow(),
            TransactionStatus::None => status.as_str().normal(),
        }
    }

    /// Format a response as JSON
    fn format_json(response: &Response) -> String {
        let json = match response {
            Response::Message(msg) => serde_json::json!({
                "status": "success",
                "message": msg,
            }),
            Response::Value { key, value } => serde_json::json!({
                "key": key,
                "value": value,
            }),
            Response::Rows(rows) => serde_json::json!({
                "rows": rows
                    .iter()
                    .map(|(k, v)| serde_json::json!({ "key": k, "value": v }))
                    .collect::<Vec<_>>(),
                "count": rows.len(),
            }),
            Response::Status(summary) => serde_json::json!(summary),
            Response::Stats(stats) => serde_json::json!(stats),
            Response::Help => serde_json::json!({ "help": help_text() }),
            Response::Exit => serde_json::json!({ "status": "exit" }),
        };

        serde_json::to_string_pretty(&json).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize result to JSON\"}".to_string()
        })
    }

    /// Format an error for the terminal
    pub fn format_error(error: &dyn std::error::Error, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => format!("{}", format!("Error: {}", error).red()),
            OutputFormat::Json => serde_json::json!({
                "status": "error",
                "error": error.to_string(),
            })
            .to_string(),
        }
    }
}

fn help_text() -> String {
    [
        "Transaction control:",
        "  BEGIN                         start a transaction",
        "  COMMIT                        finalize every change",
        "  ROLLBACK                      undo every change",
        "  SAVEPOINT <name>              define a savepoint",
        "  RELEASE [SAVEPOINT] <name>    drop a savepoint and later ones",
        "  ROLLBACK TO [SAVEPOINT] <name> undo changes after a savepoint",
        "Data:",
        "  PUT <key> <value>             write a key",
        "  DELETE <key>                  remove a key",
        "  GET <key>                     read a key",
        "  SCAN                          list every key",
        "Session:",
        "  STATUS                        show the current transaction",
        "  STATS                         show session counters",
        "  HELP                          show this help",
        "  EXIT                          leave the shell",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rows() {
        let response = Response::Rows(vec![("a".to_string(), "1".to_string())]);
        let output = ResultFormatter::format(&response, OutputFormat::Json);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["rows"][0]["key"], "a");
    }

    #[test]
    fn test_json_status() {
        let summary = TransactionSummary {
            transaction_id: Some(4),
            status: TransactionStatus::Failed,
            change_count: 2,
            savepoints: Vec::new(),
            failure: Some("undo of change #2 failed".to_string()),
            elapsed_ms: Some(3),
        };
        let output = ResultFormatter::format(&Response::Status(summary), OutputFormat::Json);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["transaction_id"], 4);
    }

    #[test]
    fn test_table_missing_value() {
        colored::control::set_override(false);
        let response = Response::Value {
            key: "k".to_string(),
            value: None,
        };
        assert_eq!(
            ResultFormatter::format(&response, OutputFormat::Table),
            "k is not set"
        );
    }
}
