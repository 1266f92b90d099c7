//! Raw SQL Gatekeeper
//!
//! Stateless classifier for free-form SQL in raw-query mode.
//!
//! # Validation Strategy
//! 1. Reject empty or whitespace-only input
//! 2. The first whitespace-delimited token, upper-cased, must be one of
//!    SELECT, SHOW, DESCRIBE, DESC or EXPLAIN
//! 3. No dangerous keyword may appear anywhere as a whole word
//!
//! Word matching treats letters, digits and underscore as word characters, so
//! identifiers such as `last_update` or `created_at` never trip the scan.
//!
//! The executor separately refuses multi-statement text (see
//! [`ensure_single_statement`]); the classifier itself does not parse SQL.

use std::collections::HashSet;

use crate::allowlist::{ALLOWED_COMMANDS, DANGEROUS_KEYWORDS};
use crate::error::{GateError, Result};

/// Classify a raw SQL string, returning the trimmed statement when accepted.
pub fn check_statement(sql: &str) -> Result<&str> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(GateError::rejected("SQL statement is empty"));
    }

    let command = trimmed.split_whitespace().next().unwrap_or_default().to_uppercase();
    if !ALLOWED_COMMANDS.contains(&command.as_str()) {
        return Err(GateError::rejected(format!(
            "Command not allowed: {command}. Only {} statements can be executed",
            ALLOWED_COMMANDS.join(", ")
        )));
    }

    if let Some(keyword) = find_dangerous_keyword(trimmed) {
        return Err(GateError::rejected(format!("Dangerous keyword detected: {keyword}")));
    }

    Ok(trimmed)
}

/// First keyword of [`DANGEROUS_KEYWORDS`] present as a whole word
fn find_dangerous_keyword(sql: &str) -> Option<&'static str> {
    let upper = sql.to_uppercase();
    let words: HashSet<&str> =
        upper.split(|c: char| !(c.is_alphanumeric() || c == '_')).filter(|w| !w.is_empty()).collect();

    DANGEROUS_KEYWORDS.iter().copied().find(|keyword| words.contains(keyword))
}

/// Refuse text that carries more than one statement.
///
/// Trailing `;` separators are tolerated. Separators inside quoted strings,
/// backtick identifiers and comments are ignored. Comments follow the server's
/// rules: `--` opens a comment only when followed by whitespace, a control
/// character or the end of input, and the bodies of `/*! ... */` and
/// `/*+ ... */` are executed, so they are scanned as code.
pub fn ensure_single_statement(sql: &str) -> Result<()> {
    let body: Vec<char> = sql.trim().trim_end_matches(';').trim_end().chars().collect();

    let mut idx = 0;
    let mut quote: Option<char> = None;

    while let Some(&ch) = body.get(idx) {
        idx += 1;

        if let Some(q) = quote {
            if ch == '\\' && q != '`' {
                idx += 1; // escaped character
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '-' if body.get(idx) == Some(&'-') && opens_line_comment(body.get(idx + 1)) => {
                idx = skip_line(&body, idx + 1);
            }
            '#' => idx = skip_line(&body, idx),
            '/' if body.get(idx) == Some(&'*') => {
                if matches!(body.get(idx + 1), Some('!' | '+')) {
                    // Executable comment: keep scanning its body
                    idx += 2;
                } else {
                    idx = skip_block(&body, idx + 1);
                }
            }
            ';' => {
                return Err(GateError::rejected(
                    "Multiple statements per call are not permitted",
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

/// `--` starts a comment only before whitespace, a control character or end of input
fn opens_line_comment(next: Option<&char>) -> bool {
    next.map_or(true, |c| c.is_whitespace() || c.is_control())
}

/// Index just past the next newline at or after `from`
fn skip_line(body: &[char], from: usize) -> usize {
    body[from.min(body.len())..]
        .iter()
        .position(|&c| c == '\n')
        .map_or(body.len(), |offset| from + offset + 1)
}

/// Index just past the `*/` that closes a block comment whose body starts at `from`
fn skip_block(body: &[char], from: usize) -> usize {
    let mut idx = from;
    while idx + 1 < body.len() {
        if body[idx] == '*' && body[idx + 1] == '/' {
            return idx + 2;
        }
        idx += 1;
    }
    body.len()
}
