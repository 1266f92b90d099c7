//! MySQL Database Collaborator
//!
//! Implements [`Database`] and [`Session`] on top of `mysql_async`.
//!
//! # Implementation Notes
//! - One TCP connection per request, opened in [`Database::acquire`]
//! - Dropping a [`MySqlSession`] disconnects it (`mysql_async::Conn` closes on drop)
//! - Parameterized statements use the binary protocol (`exec`), which never
//!   accepts more than one statement
//! - Parameter-free statements use the text protocol (`query`) after the
//!   single-statement guard
//! - Text-protocol values are decoded by column type so integers and decimals
//!   arrive as JSON numbers
//! - DATE/DATETIME values are rendered as `YYYY-MM-DD[ HH:MM:SS]`
//! - Non-UTF-8 BLOB data is Base64-encoded for JSON safety

use mysql_async::consts::ColumnType;
use mysql_async::{prelude::*, Conn, Opts, OptsBuilder, Params, Value};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::DatabaseSettings;
use crate::engine::{Database, Row, Session};
use crate::error::{GateError, Result};
use crate::gatekeeper::ensure_single_statement;
use crate::query::{Param, Statement};

/// MySQL-backed database collaborator
#[derive(Debug, Clone)]
pub struct MySqlDatabase {
    opts: Opts,
}

impl MySqlDatabase {
    /// Build connection options from settings. No connection is opened here.
    #[must_use]
    pub fn new(settings: &DatabaseSettings) -> Self {
        let opts = OptsBuilder::default()
            .ip_or_hostname(settings.host.clone())
            .tcp_port(settings.port)
            .user(Some(settings.user.clone()))
            .pass(Some(settings.password.clone()))
            .db_name(Some(settings.database.clone()));

        Self { opts: Opts::from(opts) }
    }
}

impl Database for MySqlDatabase {
    type Session = MySqlSession;

    async fn acquire(&self) -> Result<MySqlSession> {
        let conn = Conn::new(self.opts.clone()).await.map_err(|e| {
            GateError::connection_failed(format!("Failed to connect to MySQL: {e}"))
        })?;
        debug!(connection_id = conn.id(), "acquired connection");
        Ok(MySqlSession { conn })
    }
}

/// One request's connection
pub struct MySqlSession {
    conn: Conn,
}

impl Session for MySqlSession {
    async fn fetch(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        let rows: Vec<mysql_async::Row> = if statement.params().is_empty() {
            ensure_single_statement(statement.sql())?;
            self.conn.query(statement.sql()).await.map_err(map_driver_error)?
        } else {
            let params = Params::Positional(statement.params().iter().map(to_mysql_value).collect());
            self.conn.exec(statement.sql(), params).await.map_err(map_driver_error)?
        };

        debug!(rows = rows.len(), "statement returned");
        rows.iter().map(row_to_json).collect()
    }
}

fn to_mysql_value(param: &Param) -> Value {
    match param {
        Param::Text(text) => Value::Bytes(text.as_bytes().to_vec()),
        Param::Int(i) => Value::Int(*i),
    }
}

/// Server errors are statement problems; I/O errors are connectivity problems.
fn map_driver_error(err: mysql_async::Error) -> GateError {
    match err {
        mysql_async::Error::Server(server) => GateError::query_failed(server.message),
        mysql_async::Error::Io(io) => GateError::connection_failed(io.to_string()),
        other => GateError::query_failed(other.to_string()),
    }
}

/// Convert a MySQL row to a JSON object keyed by column name
fn row_to_json(row: &mysql_async::Row) -> Result<Row> {
    let mut map = Row::new();

    for (idx, column) in row.columns_ref().iter().enumerate() {
        let value = row.as_ref(idx).ok_or_else(|| {
            GateError::query_failed(format!("Failed to get value at index {idx}"))
        })?;
        map.insert(column.name_str().to_string(), decode_value(value, column.column_type()));
    }

    Ok(map)
}

/// Convert MySQL value to JSON value
fn decode_value(value: &Value, column_type: ColumnType) -> JsonValue {
    match value {
        Value::NULL => JsonValue::Null,
        Value::Bytes(bytes) => decode_text(bytes, column_type),
        Value::Int(i) => JsonValue::from(*i),
        Value::UInt(u) => JsonValue::from(*u),
        Value::Float(f) => float(f64::from(*f)),
        Value::Double(d) => float(*d),
        Value::Date(year, month, day, hour, minute, second, micro) => JsonValue::String(
            format_datetime(*year, *month, *day, (*hour, *minute, *second, *micro), column_type),
        ),
        Value::Time(is_negative, days, hours, minutes, seconds, microseconds) => {
            let sign = if *is_negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(*hours);
            let mut text = format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}");
            if *microseconds > 0 {
                text.push_str(&format!(".{microseconds:06}"));
            }
            JsonValue::String(text)
        }
    }
}

/// Decode a text-protocol cell according to its column type
fn decode_text(bytes: &[u8], column_type: ColumnType) -> JsonValue {
    let Ok(text) = std::str::from_utf8(bytes) else {
        use base64::Engine;
        return JsonValue::String(base64::engine::general_purpose::STANDARD.encode(bytes));
    };

    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => text
            .parse::<i64>()
            .map(JsonValue::from)
            .or_else(|_| text.parse::<u64>().map(JsonValue::from))
            .unwrap_or_else(|_| JsonValue::String(text.to_string())),
        ColumnType::MYSQL_TYPE_DECIMAL
        | ColumnType::MYSQL_TYPE_NEWDECIMAL
        | ColumnType::MYSQL_TYPE_FLOAT
        | ColumnType::MYSQL_TYPE_DOUBLE => {
            text.parse::<f64>().map_or_else(|_| JsonValue::String(text.to_string()), float)
        }
        _ => JsonValue::String(text.to_string()),
    }
}

/// NaN/Infinity have no JSON form and become null
fn float(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}

fn format_datetime(
    year: u16,
    month: u8,
    day: u8,
    (hour, minute, second, micro): (u8, u8, u8, u32),
    column_type: ColumnType,
) -> String {
    let date = chrono::NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day));
    let Some(date) = date else {
        // Zero dates ("0000-00-00") have no calendar form
        return format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}");
    };

    if column_type == ColumnType::MYSQL_TYPE_DATE {
        return date.format("%Y-%m-%d").to_string();
    }

    date.and_hms_micro_opt(u32::from(hour), u32::from(minute), u32::from(second), micro)
        .map_or_else(
            || date.format("%Y-%m-%d").to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_text_integers() {
        assert_eq!(decode_text(b"42", ColumnType::MYSQL_TYPE_LONG), json!(42));
        assert_eq!(decode_text(b"2006", ColumnType::MYSQL_TYPE_YEAR), json!(2006));
        assert_eq!(
            decode_text(b"18446744073709551615", ColumnType::MYSQL_TYPE_LONGLONG),
            json!(18_446_744_073_709_551_615_u64)
        );
    }

    #[test]
    fn test_decode_text_decimal_becomes_float() {
        assert_eq!(decode_text(b"4.99", ColumnType::MYSQL_TYPE_NEWDECIMAL), json!(4.99));
        assert_eq!(decode_text(b"5000.00", ColumnType::MYSQL_TYPE_NEWDECIMAL), json!(5000.0));
    }

    #[test]
    fn test_decode_text_strings_and_blobs() {
        assert_eq!(decode_text(b"ACADEMY DINOSAUR", ColumnType::MYSQL_TYPE_VAR_STRING), json!("ACADEMY DINOSAUR"));
        assert_eq!(decode_text(&[0xff, 0xfe], ColumnType::MYSQL_TYPE_BLOB), json!("//4="));
    }

    #[test]
    fn test_decode_binary_values() {
        assert_eq!(decode_value(&Value::NULL, ColumnType::MYSQL_TYPE_LONG), JsonValue::Null);
        assert_eq!(decode_value(&Value::Int(-3), ColumnType::MYSQL_TYPE_LONG), json!(-3));
        assert_eq!(decode_value(&Value::Double(f64::NAN), ColumnType::MYSQL_TYPE_DOUBLE), JsonValue::Null);
        assert_eq!(
            decode_value(&Value::Time(false, 1, 2, 3, 4, 0), ColumnType::MYSQL_TYPE_TIME),
            json!("26:03:04")
        );
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(
            format_datetime(2005, 5, 24, (22, 53, 30, 0), ColumnType::MYSQL_TYPE_DATETIME),
            "2005-05-24 22:53:30"
        );
        assert_eq!(
            format_datetime(2006, 2, 15, (0, 0, 0, 0), ColumnType::MYSQL_TYPE_DATE),
            "2006-02-15"
        );
        assert_eq!(
            format_datetime(0, 0, 0, (0, 0, 0, 0), ColumnType::MYSQL_TYPE_DATETIME),
            "0000-00-00 00:00:00"
        );
    }

    #[test]
    fn test_params_conversion() {
        assert_eq!(to_mysql_value(&Param::Int(7)), Value::Int(7));
        assert_eq!(to_mysql_value(&Param::Text("PG".into())), Value::Bytes(b"PG".to_vec()));
    }

    // Note: Live tests require a running MySQL instance with the Sakila schema.
    // Run with: cargo test -- --ignored

    #[tokio::test]
    #[ignore] // Requires running MySQL instance
    async fn test_live_show_tables() {
        let settings = DatabaseSettings::from_env().unwrap();
        let db = MySqlDatabase::new(&settings);
        let mut session = db.acquire().await.unwrap();
        let rows = session.fetch(&Statement::raw("SHOW TABLES")).await.unwrap();
        assert!(!rows.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires running MySQL instance
    async fn test_live_multi_statement_refused() {
        let settings = DatabaseSettings::from_env().unwrap();
        let db = MySqlDatabase::new(&settings);
        let mut session = db.acquire().await.unwrap();
        let err = session.fetch(&Statement::raw("SELECT 1; SELECT 2")).await.unwrap_err();
        assert!(matches!(err, GateError::RejectedStatement(_)));
    }
}
