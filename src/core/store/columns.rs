//! Conversions between record fields and SQLite column values
//!
//! Timestamps are stored as fixed-width RFC 3339 text (microsecond precision,
//! `Z` suffix) so that lexical order equals chronological order.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use std::str::FromStr;

/// Current time at storage precision
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub fn opt_text(value: Option<&str>) -> Value {
    match value {
        Some(v) => Value::Text(v.to_string()),
        None => Value::Null,
    }
}

pub fn integer(value: u32) -> Value {
    Value::Integer(i64::from(value))
}

pub fn date(value: &NaiveDate) -> Value {
    Value::Text(format_date(value))
}

pub fn opt_date(value: Option<&NaiveDate>) -> Value {
    match value {
        Some(d) => date(d),
        None => Value::Null,
    }
}

pub fn timestamp(value: &DateTime<Utc>) -> Value {
    Value::Text(format_timestamp(value))
}

pub fn opt_timestamp(value: Option<&DateTime<Utc>>) -> Value {
    match value {
        Some(ts) => timestamp(ts),
        None => Value::Null,
    }
}

fn conversion_error(row: &Row<'_>, name: &str, message: String) -> rusqlite::Error {
    let index = row.as_ref().column_index(name).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

/// Read a required timestamp column
pub fn get_timestamp(row: &Row<'_>, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(row, name, format!("bad timestamp '{}': {}", raw, e)))
}

/// Read a nullable timestamp column
pub fn get_opt_timestamp(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(name)?;
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| conversion_error(row, name, format!("bad timestamp '{}': {}", raw, e))),
        None => Ok(None),
    }
}

/// Read a required `YYYY-MM-DD` column
pub fn get_date(row: &Row<'_>, name: &str) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(name)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| conversion_error(row, name, format!("bad date '{}': {}", raw, e)))
}

/// Read a nullable `YYYY-MM-DD` column
pub fn get_opt_date(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(name)?;
    match raw {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| conversion_error(row, name, format!("bad date '{}': {}", raw, e))),
        None => Ok(None),
    }
}

/// Read an enum column through its `FromStr`
pub fn get_choice<T>(row: &Row<'_>, name: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(name)?;
    raw.parse::<T>().map_err(|e| conversion_error(row, name, e))
}

/// Read a non-negative integer column
pub fn get_count(row: &Row<'_>, name: &str) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(name)?;
    u32::try_from(raw).map_err(|_| conversion_error(row, name, format!("bad count {}", raw)))
}

/// Store a list of strings as a JSON array
pub fn string_list(values: &[String]) -> Value {
    Value::Text(serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string()))
}

/// Read a JSON-array text column
pub fn get_string_list(row: &Row<'_>, name: &str) -> rusqlite::Result<Vec<String>> {
    let raw: Option<String> = row.get(name)?;
    match raw {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map_err(|e| conversion_error(row, name, format!("bad list '{}': {}", raw, e))),
        _ => Ok(Vec::new()),
    }
}

/// Read a nullable text column as an empty-defaulted `String`
pub fn get_text_or_empty(row: &Row<'_>, name: &str) -> rusqlite::Result<String> {
    let raw: Option<String> = row.get(name)?;
    Ok(raw.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let early = DateTime::parse_from_rfc3339("2024-01-01T09:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2024-01-01T09:00:01Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(format_timestamp(&early) < format_timestamp(&late));
        assert_eq!(format_timestamp(&late), "2024-01-01T09:00:01.000000Z");
    }

    #[test]
    fn test_now_roundtrips_through_text() {
        let ts = now();
        let parsed = DateTime::parse_from_rfc3339(&format_timestamp(&ts))
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ts, parsed);
    }
}
