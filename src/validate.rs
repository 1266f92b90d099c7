//! Argument Validators
//!
//! Each validator takes one raw, possibly absent argument and either returns a
//! normalized domain value, returns the documented default, or fails with
//! [`GateError::Validation`] naming the offending value and the valid domain.

use std::ops::RangeInclusive;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::allowlist::{ClosedSet, KnownTable, Rating, KNOWN_TABLES, VALID_STORES};
use crate::error::{GateError, Result};

/// Default and ceiling for a row-limit argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    /// Value used when the argument is absent
    pub default: i64,
    /// Inclusive upper bound
    pub max: i64,
}

impl LimitPolicy {
    /// Intent-mode listings: default 10, at most 50
    pub const LISTING: Self = Self { default: 10, max: 50 };
    /// Overdue rentals: default 20, at most 100
    pub const OVERDUE: Self = Self { default: 20, max: 100 };
    /// Raw-mode sampling: default 5, at most 10
    pub const SAMPLE: Self = Self { default: 5, max: 10 };
    /// Fixed-shape reports (categories, stores, revenue groups): always 100
    pub const REPORT: Self = Self { default: 100, max: 100 };
}

/// Clamp a limit into `[1, policy.max]`; absent yields `policy.default`.
#[must_use]
pub fn validate_limit(value: Option<i64>, policy: LimitPolicy) -> i64 {
    value.unwrap_or(policy.default).clamp(1, policy.max)
}

/// Case-insensitive rating match; absent means "no filter".
pub fn validate_rating(value: Option<&str>) -> Result<Option<Rating>> {
    value.map(parse_member::<Rating>).transpose()
}

/// Store id membership in {1, 2}; absent means "all stores".
pub fn validate_store_id(value: Option<i64>) -> Result<Option<i64>> {
    match value {
        None => Ok(None),
        Some(id) if VALID_STORES.contains(&id) => Ok(Some(id)),
        Some(id) => Err(GateError::validation(format!(
            "Invalid store ID: {id}. Valid store IDs: {}",
            VALID_STORES.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// Enum-valued parameter with a documented default.
pub fn validate_choice<T: ClosedSet>(value: Option<&str>, default: T) -> Result<T> {
    value.map_or(Ok(default), parse_member::<T>)
}

fn parse_member<T: ClosedSet>(raw: &str) -> Result<T> {
    T::parse(raw).ok_or_else(|| {
        GateError::validation(format!(
            "Invalid {} '{raw}'. Valid values: {}",
            T::LABEL,
            T::valid_values()
        ))
    })
}

/// Table identifier check for raw mode.
///
/// Rejects empty names, names that are not plain identifiers, and names
/// outside the known-table allow-list. Every failure lists the valid tables.
pub fn validate_table_name(value: &str) -> Result<KnownTable> {
    let available = KNOWN_TABLES.join(", ");

    if value.is_empty() {
        return Err(GateError::validation(format!(
            "Table name cannot be empty. Available tables: {available}"
        )));
    }

    if !is_identifier(value) {
        return Err(GateError::validation(format!(
            "Invalid table name: {value}. Available tables: {available}"
        )));
    }

    let lowered = value.to_ascii_lowercase();
    KNOWN_TABLES
        .iter()
        .find(|t| **t == lowered)
        .map(|t| KnownTable::new(t))
        .ok_or_else(|| {
            GateError::validation(format!(
                "Table does not exist: {value}. Available tables: {available}"
            ))
        })
}

/// Letters, digits and underscore, not starting with a digit
fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Day count within `range`; absent yields `default`.
pub fn validate_days(
    name: &str,
    value: Option<i64>,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64> {
    let days = value.unwrap_or(default);
    if range.contains(&days) {
        Ok(days)
    } else {
        Err(GateError::validation(format!(
            "Invalid {name}: {days}. Must be between {} and {}",
            range.start(),
            range.end()
        )))
    }
}

/// Optional free-text filter: trimmed, blank treated as absent.
#[must_use]
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Required free-text argument: trimmed and non-blank.
pub fn require_text(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(GateError::validation(format!("{name} cannot be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Decode an argument map into a typed argument struct.
///
/// Type mismatches and missing required fields become validation errors.
pub fn decode_args<T: DeserializeOwned>(arguments: &Map<String, Value>) -> Result<T> {
    // Clients send explicit nulls for "not provided"; drop them so that
    // defaults apply uniformly.
    let cleaned: Map<String, Value> =
        arguments.iter().filter(|(_, v)| !v.is_null()).map(|(k, v)| (k.clone(), v.clone())).collect();

    serde_json::from_value(Value::Object(cleaned))
        .map_err(|e| GateError::validation(format!("Invalid arguments: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::{Metric, Period, RentalStatus};
    use serde::Deserialize;

    #[test]
    fn test_validate_rating_valid() {
        for rating in Rating::ALL {
            assert_eq!(validate_rating(Some(rating.as_str())).unwrap(), Some(*rating));
        }
        assert_eq!(validate_rating(Some("pg-13")).unwrap(), Some(Rating::Pg13));
    }

    #[test]
    fn test_validate_rating_invalid() {
        let err = validate_rating(Some("X")).unwrap_err();
        assert!(matches!(err, GateError::Validation(_)));
        assert!(err.message().contains("'X'"));
        assert!(err.message().contains("PG-13"));
    }

    #[test]
    fn test_validate_rating_none() {
        assert_eq!(validate_rating(None).unwrap(), None);
    }

    #[test]
    fn test_validate_store_id() {
        assert_eq!(validate_store_id(Some(1)).unwrap(), Some(1));
        assert_eq!(validate_store_id(Some(2)).unwrap(), Some(2));
        assert_eq!(validate_store_id(None).unwrap(), None);
        for bad in [0, 3, -1] {
            let err = validate_store_id(Some(bad)).unwrap_err();
            assert!(err.message().contains("Invalid store ID"));
        }
    }

    #[test]
    fn test_validate_limit_clamps() {
        assert_eq!(validate_limit(Some(10), LimitPolicy::LISTING), 10);
        assert_eq!(validate_limit(Some(50), LimitPolicy::LISTING), 50);
        assert_eq!(validate_limit(Some(1000), LimitPolicy::LISTING), 50);
        assert_eq!(validate_limit(Some(0), LimitPolicy::LISTING), 1);
        assert_eq!(validate_limit(Some(-5), LimitPolicy::LISTING), 1);
        assert_eq!(validate_limit(None, LimitPolicy::LISTING), 10);
        assert_eq!(validate_limit(None, LimitPolicy::OVERDUE), 20);
        assert_eq!(validate_limit(Some(500), LimitPolicy::OVERDUE), 100);
        assert_eq!(validate_limit(None, LimitPolicy::SAMPLE), 5);
        assert_eq!(validate_limit(Some(11), LimitPolicy::SAMPLE), 10);
    }

    #[test]
    fn test_validate_choice() {
        assert_eq!(validate_choice(None, Period::AllTime).unwrap(), Period::AllTime);
        assert_eq!(validate_choice(Some("LAST_WEEK"), Period::AllTime).unwrap(), Period::LastWeek);
        assert_eq!(validate_choice(Some("returned"), RentalStatus::All).unwrap(), RentalStatus::Returned);
        assert_eq!(validate_choice(Some("Spending"), Metric::Rentals).unwrap(), Metric::Spending);

        let err = validate_choice(Some("invalid"), Period::AllTime).unwrap_err();
        assert!(err.message().contains("Invalid period 'invalid'"));
        assert!(err.message().contains("all_time, last_month, last_week"));

        let err = validate_choice(Some("pending"), RentalStatus::All).unwrap_err();
        assert!(err.message().contains("Invalid status"));
    }

    #[test]
    fn test_validate_table_name() {
        assert_eq!(validate_table_name("film").unwrap().name(), "film");
        assert_eq!(validate_table_name("FILM_ACTOR").unwrap().name(), "film_actor");

        let err = validate_table_name("").unwrap_err();
        assert!(err.message().contains("cannot be empty"));

        let err = validate_table_name("film; DROP TABLE film").unwrap_err();
        assert!(err.message().contains("Invalid table name"));

        let err = validate_table_name("1film").unwrap_err();
        assert!(err.message().contains("Invalid table name"));

        let err = validate_table_name("nonexistent").unwrap_err();
        assert!(err.message().contains("Table does not exist"));
        for table in KNOWN_TABLES {
            assert!(err.message().contains(table));
        }
    }

    #[test]
    fn test_validate_days() {
        assert_eq!(validate_days("days_overdue", None, 0, 0..=3650).unwrap(), 0);
        assert_eq!(validate_days("days_overdue", Some(7), 0, 0..=3650).unwrap(), 7);
        assert!(validate_days("days_overdue", Some(-1), 0, 0..=3650).is_err());
        assert!(validate_days("days_overdue", Some(4000), 0, 0..=3650).is_err());

        let err = validate_days("days_not_rented", Some(0), 30, 1..=3650).unwrap_err();
        assert!(err.message().contains("between 1 and 3650"));
    }

    #[test]
    fn test_text_normalization() {
        assert_eq!(normalize_text(Some("  love ".into())), Some("love".into()));
        assert_eq!(normalize_text(Some("   ".into())), None);
        assert_eq!(normalize_text(None), None);
        assert!(require_text("title", " ").is_err());
    }

    #[derive(Debug, Deserialize)]
    struct SearchArgs {
        title: String,
        limit: Option<i64>,
    }

    #[test]
    fn test_decode_args() {
        let args = serde_json::json!({"title": "Love", "limit": null, "extra": true});
        let decoded: SearchArgs = decode_args(args.as_object().unwrap()).unwrap();
        assert_eq!(decoded.title, "Love");
        assert_eq!(decoded.limit, None);

        let args = serde_json::json!({"title": "Love", "limit": "ten"});
        let err = decode_args::<SearchArgs>(args.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, GateError::Validation(_)));

        let args = serde_json::json!({});
        let err = decode_args::<SearchArgs>(args.as_object().unwrap()).unwrap_err();
        assert!(err.message().contains("title"));
    }
}
