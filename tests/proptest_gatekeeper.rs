//! Property-based tests for the raw SQL gatekeeper.

use proptest::prelude::*;

use sakila_mcp::allowlist::{ALLOWED_COMMANDS, DANGEROUS_KEYWORDS};
use sakila_mcp::gatekeeper::check_statement;

const SELECT_SPELLINGS: &[&str] = &["SELECT", "select", "Select"];

fn is_keyword(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    DANGEROUS_KEYWORDS.contains(&upper.as_str()) || ALLOWED_COMMANDS.contains(&upper.as_str())
}

/// Lowercase identifiers that are neither commands nor dangerous keywords
fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}".prop_filter("not a keyword", |w| !is_keyword(w))
}

proptest! {
    #[test]
    fn plain_selects_are_accepted(
        command in prop::sample::select(SELECT_SPELLINGS),
        column in identifier(),
        table in identifier(),
    ) {
        let sql = format!("  {command} {column} FROM {table}  ");
        prop_assert_eq!(check_statement(&sql).unwrap(), sql.trim());
    }

    #[test]
    fn keywords_inside_identifiers_are_accepted(
        keyword in prop::sample::select(DANGEROUS_KEYWORDS),
        suffix in "[a-z]{1,6}",
    ) {
        let sql = format!("SELECT {}_{suffix} FROM film", keyword.to_lowercase());
        prop_assert!(check_statement(&sql).is_ok(), "{sql}");
    }

    #[test]
    fn dangerous_keyword_anywhere_is_rejected(
        keyword in prop::sample::select(DANGEROUS_KEYWORDS),
        table in identifier(),
    ) {
        let sql = format!("SELECT * FROM {table}; {} {table}", keyword.to_lowercase());
        let err = check_statement(&sql).unwrap_err();
        prop_assert!(err.message().contains(keyword), "{}", err.message());
    }

    #[test]
    fn unknown_leading_command_is_rejected(command in "[A-Za-z]{1,10}", rest in identifier()) {
        prop_assume!(!ALLOWED_COMMANDS.contains(&command.to_ascii_uppercase().as_str()));
        let sql = format!("{command} {rest}");
        prop_assert!(check_statement(&sql).is_err());
    }

    #[test]
    fn whitespace_only_is_rejected(sql in "[ \t\r\n]{0,8}") {
        prop_assert!(check_statement(&sql).is_err());
    }
}
