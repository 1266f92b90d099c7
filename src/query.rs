//! Parameterized Statements
//!
//! A [`Statement`] pairs SQL text containing positional `?` placeholders with
//! the ordered values bound to them. [`QueryBuilder`] assembles statements from
//! a fixed base plus optional clauses, appending each clause's value in the
//! same step so placeholder order and parameter order cannot drift apart.
//!
//! Caller-supplied values are only ever bound, never spliced into the text.

use serde::Serialize;

use crate::error::{GateError, Result};

/// Value bound to a placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    /// Text value (LIKE patterns, emails, canonical enum spellings)
    Text(String),
    /// Integer value (ids, limits, day counts)
    Int(i64),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Wrap free text as a substring LIKE pattern, escaping LIKE metacharacters.
#[must_use]
pub fn contains_pattern(text: &str) -> Param {
    let escaped = text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    Param::Text(format!("%{escaped}%"))
}

/// SQL text plus its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Param>,
}

impl Statement {
    /// Build a statement, checking that placeholders and parameters line up.
    pub fn new(sql: impl Into<String>, params: Vec<Param>) -> Result<Self> {
        let sql = sql.into();
        let placeholders = count_placeholders(&sql);
        if placeholders != params.len() {
            return Err(GateError::internal(format!(
                "statement has {placeholders} placeholders but {} parameters",
                params.len()
            )));
        }
        Ok(Self { sql, params })
    }

    /// Parameter-free statement (raw mode, fixed introspection queries)
    pub fn raw(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: Vec::new() }
    }

    /// SQL text
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters in placeholder order
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Number of `?` placeholders in the SQL text
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }
}

/// Count `?` outside quoted literals and identifiers
fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.chars();

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) if ch == '\\' && q != '`' => {
                chars.next();
            }
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '?' => count += 1,
                _ => {}
            },
        }
    }

    count
}

/// Incremental statement assembly.
///
/// ```
/// use sakila_mcp::query::QueryBuilder;
///
/// let mut qb = QueryBuilder::new("SELECT f.title FROM film f WHERE 1=1");
/// qb.filter_opt("AND f.rating = ?", Some("PG"));
/// qb.filter_opt("AND f.length > ?", None::<i64>);
/// qb.push("ORDER BY f.title");
/// qb.limit(10);
/// let stmt = qb.build().unwrap();
/// assert_eq!(stmt.params().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    sql: String,
    params: Vec<Param>,
}

impl QueryBuilder {
    /// Start from a fixed base statement
    pub fn new(base: impl Into<String>) -> Self {
        Self { sql: base.into(), params: Vec::new() }
    }

    /// Append a fixed fragment with no parameters
    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push(' ');
        self.sql.push_str(fragment);
        self
    }

    /// Append a fragment with exactly one placeholder and its value
    pub fn filter(&mut self, fragment: &str, value: impl Into<Param>) -> &mut Self {
        self.push(fragment);
        self.params.push(value.into());
        self
    }

    /// Append a fragment whose placeholders all take the same value
    pub fn filter_repeat(&mut self, fragment: &str, value: impl Into<Param>) -> &mut Self {
        let value = value.into();
        let n = count_placeholders(fragment);
        self.push(fragment);
        self.params.extend(std::iter::repeat(value).take(n));
        self
    }

    /// [`filter`](Self::filter) when the value is present, nothing otherwise
    pub fn filter_opt<P: Into<Param>>(&mut self, fragment: &str, value: Option<P>) -> &mut Self {
        if let Some(value) = value {
            self.filter(fragment, value);
        }
        self
    }

    /// Bound `LIMIT ?`
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.filter("LIMIT ?", limit)
    }

    /// Finish, verifying the placeholder count
    pub fn build(self) -> Result<Statement> {
        Statement::new(self.sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_placeholders_ignores_quoted() {
        assert_eq!(count_placeholders("SELECT ? , '?' , `a?` , \"?\""), 1);
        assert_eq!(count_placeholders("SELECT 'it\\'s ?' , ?"), 1);
        assert_eq!(count_placeholders("SELECT 1"), 0);
    }

    #[test]
    fn test_statement_mismatch_is_internal_error() {
        let err = Statement::new("SELECT ?", vec![]).unwrap_err();
        assert!(matches!(err, GateError::Internal(_)));
        assert!(Statement::new("SELECT ?", vec![Param::Int(1)]).is_ok());
    }

    #[test]
    fn test_raw_statement_has_no_params() {
        let stmt = Statement::raw("SHOW TABLES");
        assert!(stmt.params().is_empty());
        assert_eq!(stmt.placeholder_count(), 0);
    }

    #[test]
    fn test_builder_orders_params_like_clauses() {
        let mut qb = QueryBuilder::new("SELECT * FROM film f WHERE 1=1");
        qb.filter_opt("AND f.title LIKE ?", Some(contains_pattern("Love")));
        qb.filter_opt("AND f.rating = ?", None::<&str>);
        qb.filter("AND f.length > ?", 90);
        qb.limit(10);
        let stmt = qb.build().unwrap();

        assert_eq!(
            stmt.sql(),
            "SELECT * FROM film f WHERE 1=1 AND f.title LIKE ? AND f.length > ? LIMIT ?"
        );
        assert_eq!(
            stmt.params(),
            &[Param::Text("%Love%".into()), Param::Int(90), Param::Int(10)]
        );
    }

    #[test]
    fn test_filter_repeat() {
        let mut qb = QueryBuilder::new("SELECT 1 FROM actor a WHERE");
        qb.filter_repeat("(a.first_name LIKE ? OR a.last_name LIKE ?)", "%x%");
        let stmt = qb.build().unwrap();
        assert_eq!(stmt.params().len(), 2);
    }

    #[test]
    fn test_contains_pattern_escapes_metacharacters() {
        assert_eq!(contains_pattern("50%_off"), Param::Text("%50\\%\\_off%".into()));
        assert_eq!(contains_pattern("'; DROP TABLE film; --"), Param::Text("%'; DROP TABLE film; --%".into()));
    }
}
