//! Conversion of Postgres rows into JSON objects.
//!
//! Values are decoded by the column's Postgres type name. Anything without a
//! mapping (enums, INTERVAL, INET, MONEY, other arrays) is returned as the
//! text Postgres sent for it.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgRow, PgValueRef};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use uuid::Uuid;

/// One result row: column name to value, in select-list order.
pub type RowMap = Map<String, Value>;

/// Convert a sqlx row to a JSON object.
pub fn row_to_json(row: &PgRow) -> RowMap {
    let mut obj = Map::with_capacity(row.len());
    for (idx, col) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, col.type_info().name());
        obj.insert(col.name().to_string(), value);
    }
    obj
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Value {
    let raw = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };

    let decoded: Result<Value, sqlx::Error> = match type_name {
        "BOOL" => row.try_get::<bool, _>(idx).map(Value::from),
        "INT2" => row.try_get::<i16, _>(idx).map(Value::from),
        "INT4" => row.try_get::<i32, _>(idx).map(Value::from),
        "INT8" => row.try_get::<i64, _>(idx).map(Value::from),
        "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| Value::from(f64::from(v))),
        "FLOAT8" => row.try_get::<f64, _>(idx).map(Value::from),
        "NUMERIC" => row
            .try_get::<BigDecimal, _>(idx)
            .map(|v| numeric_to_json(&v)),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx),
        "UUID" => row
            .try_get::<Uuid, _>(idx)
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(idx)
            .map(|v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => row
            .try_get::<NaiveDate, _>(idx)
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(idx)
            .map(|v| Value::String(v.to_string())),
        "TEXT[]" | "VARCHAR[]" => row.try_get::<Vec<String>, _>(idx).map(Value::from),
        "INT4[]" => row.try_get::<Vec<i32>, _>(idx).map(Value::from),
        "INT8[]" => row.try_get::<Vec<i64>, _>(idx).map(Value::from),
        _ => as_text(&raw),
    };

    decoded
        .or_else(|_| as_text(&raw))
        .unwrap_or_else(|e| {
            tracing::debug!(column = idx, type_name, error = %e, "Undecodable column, returning null");
            Value::Null
        })
}

/// Simple-protocol results arrive in text format, so the raw bytes are the
/// Postgres rendering of the value.
fn as_text(raw: &PgValueRef<'_>) -> Result<Value, sqlx::Error> {
    raw.as_str()
        .map(|s| Value::String(s.to_string()))
        .map_err(sqlx::Error::Decode)
}

/// Render NUMERIC as a JSON number when that loses nothing, otherwise as a string.
pub fn numeric_to_json(value: &BigDecimal) -> Value {
    let text = value.to_string();
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }

    let significant = text
        .chars()
        .filter(char::is_ascii_digit)
        .skip_while(|c| *c == '0')
        .count();
    if significant <= 15
        && let Ok(float) = text.parse::<f64>()
        && float.is_finite()
    {
        return Value::from(float);
    }

    Value::String(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn numeric(s: &str) -> Value {
        numeric_to_json(&BigDecimal::from_str(s).unwrap())
    }

    #[test]
    fn test_numeric_integer() {
        assert_eq!(numeric("42"), json!(42));
        assert_eq!(numeric("-7"), json!(-7));
    }

    #[test]
    fn test_numeric_fraction() {
        assert_eq!(numeric("12.50"), json!(12.5));
        assert_eq!(numeric("0.001"), json!(0.001));
    }

    #[test]
    fn test_numeric_too_precise_stays_text() {
        assert_eq!(
            numeric("12345678901234567890.5"),
            json!("12345678901234567890.5")
        );
    }
}
