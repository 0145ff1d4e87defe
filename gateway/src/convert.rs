//! Driver row to JSON row conversion.
//!
//! MySQL and PostgreSQL rows come from `raw_sql`, i.e. the text protocol, so
//! every non-null value decodes as text and the column type decides how the
//! text becomes JSON. SQLite values carry their own storage class instead.

use std::fmt::Write;

use common::models::query::Row;
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// Converts a MySQL text-protocol row.
pub fn mysql_row(row: &MySqlRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let ordinal = column.ordinal();
        let value = match row.try_get_raw(ordinal) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(_) => match row.try_get_unchecked::<String, _>(ordinal) {
                Ok(text) => from_text(mysql_type_name(column.type_info().name()), text),
                Err(_) => row
                    .try_get_unchecked::<Vec<u8>, _>(ordinal)
                    .map(|bytes| Value::String(hex(&bytes)))
                    .unwrap_or(Value::Null),
            },
            Err(_) => Value::Null,
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

/// MySQL has no boolean column type; `BOOLEAN` is how the driver reports
/// `TINYINT(1)`, whose values stay the numbers `0` and `1`.
fn mysql_type_name(name: &str) -> &str {
    if name.eq_ignore_ascii_case("BOOLEAN") {
        "TINYINT"
    } else {
        name
    }
}

/// Converts a PostgreSQL simple-query row.
pub fn postgres_row(row: &PgRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let ordinal = column.ordinal();
        let value = match row.try_get_raw(ordinal) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(_) => row
                .try_get_unchecked::<String, _>(ordinal)
                .map(|text| from_text(column.type_info().name(), text))
                .unwrap_or(Value::Null),
            Err(_) => Value::Null,
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

/// Converts a SQLite row using each value's storage class.
pub fn sqlite_row(row: &SqliteRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let ordinal = column.ordinal();
        let storage = match row.try_get_raw(ordinal) {
            Ok(raw) if raw.is_null() => None,
            Ok(raw) => Some(raw.type_info().name().to_string()),
            Err(_) => None,
        };
        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER") => row
                .try_get_unchecked::<i64, _>(ordinal)
                .map(Value::from)
                .unwrap_or(Value::Null),
            Some("REAL") => row
                .try_get_unchecked::<f64, _>(ordinal)
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Some("BLOB") => row
                .try_get_unchecked::<Vec<u8>, _>(ordinal)
                .map(|bytes| Value::String(hex(&bytes)))
                .unwrap_or(Value::Null),
            Some(_) => row
                .try_get_unchecked::<String, _>(ordinal)
                .map(Value::String)
                .unwrap_or(Value::Null),
        };
        out.insert(column.name().to_string(), value);
    }
    out
}

/// Maps a textual value to JSON according to the SQL type name.
///
/// Integers, floats, booleans (PostgreSQL `t`/`f`) and JSON documents become
/// native JSON values.
/// DECIMAL/NUMERIC stay strings so no precision is lost; so do dates and
/// everything else.
pub fn from_text(type_name: &str, text: String) -> Value {
    let upper = type_name.to_ascii_uppercase();
    let base = upper
        .split(|c: char| c == ' ' || c == '(')
        .next()
        .unwrap_or_default();

    match base {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" | "INT2"
        | "INT4" | "INT8" | "OID" => {
            if let Ok(n) = text.parse::<i64>() {
                Value::from(n)
            } else if let Ok(n) = text.parse::<u64>() {
                Value::from(n)
            } else {
                Value::String(text)
            }
        }
        "FLOAT" | "DOUBLE" | "REAL" | "FLOAT4" | "FLOAT8" => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        "BOOLEAN" | "BOOL" => match text.as_str() {
            "1" | "t" | "true" => Value::Bool(true),
            "0" | "f" | "false" => Value::Bool(false),
            _ => Value::String(text),
        },
        "JSON" | "JSONB" => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        _ => Value::String(text),
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
