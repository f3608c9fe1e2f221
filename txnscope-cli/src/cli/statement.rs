// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shell command language
//!
//! One command per line, keywords case-insensitive, `#` starts a comment
//! line and a trailing `;` is ignored.

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Begin,
    Commit,
    Rollback,
    RollbackTo(String),
    Savepoint(String),
    Release(String),
    Put { key: String, value: String },
    Delete(String),
    Get(String),
    Scan,
    Status,
    Stats,
    Help,
    Exit,
}

/// Parse one line; blank and comment lines yield `Ok(None)`
pub fn parse_statement(line: &str) -> Result<Option<Statement>, String> {
    let line = line.trim();
    let line = line.strip_suffix(';').unwrap_or(line).trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let keyword = parts.next().unwrap_or_default().to_uppercase();
    let rest = parts.next().unwrap_or_default().trim();

    let statement = match keyword.as_str() {
        "BEGIN" | "START" => {
            no_arguments(&keyword, strip_keyword(rest, "TRANSACTION"))?;
            Statement::Begin
        }
        "COMMIT" => {
            no_arguments(&keyword, rest)?;
            Statement::Commit
        }
        "ROLLBACK" => {
            if rest.is_empty() {
                Statement::Rollback
            } else {
                let target = strip_keyword(rest, "TO");
                if target.len() == rest.len() {
                    return Err(format!("Unexpected input after ROLLBACK: {}", rest));
                }
                Statement::RollbackTo(savepoint_name(strip_keyword(target, "SAVEPOINT"))?)
            }
        }
        "SAVEPOINT" => Statement::Savepoint(savepoint_name(rest)?),
        "RELEASE" => Statement::Release(savepoint_name(strip_keyword(rest, "SAVEPOINT"))?),
        "PUT" | "SET" => {
            let mut kv = rest.splitn(2, char::is_whitespace);
            let key = kv.next().unwrap_or_default();
            let value = kv.next().unwrap_or_default().trim();
            if key.is_empty() || value.is_empty() {
                return Err("Usage: PUT <key> <value>".to_string());
            }
            Statement::Put {
                key: key.to_string(),
                value: value.to_string(),
            }
        }
        "DELETE" | "DEL" => Statement::Delete(single_key(&keyword, rest)?),
        "GET" => Statement::Get(single_key(&keyword, rest)?),
        "SCAN" => Statement::Scan,
        "STATUS" => Statement::Status,
        "STATS" => Statement::Stats,
        "HELP" => Statement::Help,
        "EXIT" | "QUIT" => Statement::Exit,
        _ => return Err(format!("Unknown command: {}", keyword)),
    };
    Ok(Some(statement))
}

/// Remove a leading keyword (case-insensitive) followed by whitespace or end
fn strip_keyword<'a>(input: &'a str, keyword: &str) -> &'a str {
    let mut parts = input.splitn(2, char::is_whitespace);
    match parts.next() {
        Some(first) if first.eq_ignore_ascii_case(keyword) => {
            parts.next().unwrap_or_default().trim()
        }
        _ => input,
    }
}

fn no_arguments(keyword: &str, rest: &str) -> Result<(), String> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(format!("{} takes no arguments", keyword))
    }
}

fn savepoint_name(input: &str) -> Result<String, String> {
    let mut words = input.split_whitespace();
    match (words.next(), words.next()) {
        (Some(name), None) => Ok(name.to_string()),
        (None, _) => Err("Missing savepoint name".to_string()),
        (Some(_), Some(_)) => Err(format!("Invalid savepoint name: {}", input)),
    }
}

fn single_key(keyword: &str, input: &str) -> Result<String, String> {
    let mut words = input.split_whitespace();
    match (words.next(), words.next()) {
        (Some(key), None) => Ok(key.to_string()),
        _ => Err(format!("Usage: {} <key>", keyword)),
    }
}
