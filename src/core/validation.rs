//! Field validation helpers and the structured validation error list
//!
//! Record models collect [`FieldError`]s into a plain `Vec`; an empty list
//! means the record is valid. [`Fields`] is the name → value mapping used to
//! build records from forms and CSV rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Minimum length of titles and names
pub const MIN_TITLE_LENGTH: usize = 1;

/// Maximum length of titles, names and people
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length of free-text descriptions and notes
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Maximum number of documents attached to a handover
pub const MAX_DOCUMENTS_COUNT: usize = 10;

/// A single human-readable validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as declared on the record
    pub field: String,
    /// Message suitable for showing next to a form field
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Non-empty list of validation failures carried by `BmsError::Validation`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any failure concerns the given field
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        ValidationErrors(errors)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.message.clone()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

// =========================================================================
// Rule helpers
// =========================================================================

/// Push an error if `value` is empty or whitespace-only
pub fn require(errors: &mut Vec<FieldError>, field: &str, label: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, format!("{} is required", label)));
        false
    } else {
        true
    }
}

/// Push an error if `value` is shorter than `min` or longer than `max` characters
pub fn check_length(
    errors: &mut Vec<FieldError>,
    field: &str,
    label: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min {
        errors.push(FieldError::new(
            field,
            format!("{} must be at least {} characters", label, min),
        ));
    } else if len > max {
        errors.push(FieldError::new(
            field,
            format!("{} must be no more than {} characters", label, max),
        ));
    }
}

/// Required title-like field: non-empty and within the title length limits
pub fn check_title(errors: &mut Vec<FieldError>, field: &str, label: &str, value: &str) {
    if require(errors, field, label, value) {
        check_length(errors, field, label, value, MIN_TITLE_LENGTH, MAX_TITLE_LENGTH);
    }
}

/// Optional free-text field bounded by the description limit
pub fn check_description(errors: &mut Vec<FieldError>, field: &str, label: &str, value: &str) {
    if value.chars().count() > MAX_DESCRIPTION_LENGTH {
        errors.push(FieldError::new(
            field,
            format!(
                "{} must be no more than {} characters",
                label, MAX_DESCRIPTION_LENGTH
            ),
        ));
    }
}

// =========================================================================
// Value parsing
// =========================================================================

/// Parse a calendar date in `YYYY-MM-DD` form
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a valid date (expected YYYY-MM-DD)", value.trim()))
}

/// Parse a timestamp: RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, or a bare date (midnight UTC)
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(format!("'{}' is not a valid timestamp", value))
}

/// Parse a non-negative count
pub fn parse_count(field: &str, label: &str, value: &str) -> Result<u32, FieldError> {
    match value.trim().parse::<i64>() {
        Ok(n) if n < 0 => Err(FieldError::new(
            field,
            format!("{} cannot be negative", label),
        )),
        Ok(n) => u32::try_from(n)
            .map_err(|_| FieldError::new(field, format!("{} is too large", label))),
        Err(_) => Err(FieldError::new(
            field,
            format!("{} must be a valid number", label),
        )),
    }
}

// =========================================================================
// Field mapping
// =========================================================================

/// Normalize a field name or header: lowercase, spaces/hyphens to underscores
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// A mapping of field name to raw string value
///
/// Keys are normalized on insert so `"From Team"`, `"from-team"` and
/// `"from_team"` address the same field.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    values: BTreeMap<String, String>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// First non-blank value among `keys` (checked in order), trimmed
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.values.get(&normalize_key(k)))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// Value of the first key that is present, or empty string
    pub fn text(&self, keys: &[&str]) -> String {
        self.get(keys).unwrap_or_default().to_string()
    }

    /// Parse an optional field with `parse`, recording a failure on error
    pub fn parse_with<T>(
        &self,
        keys: &[&str],
        errors: &mut Vec<FieldError>,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Option<T> {
        let raw = self.get(keys)?;
        match parse(raw) {
            Ok(v) => Some(v),
            Err(message) => {
                errors.push(FieldError::new(keys[0], message));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k.as_ref(), v);
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        let mut errors = Vec::new();
        assert!(!require(&mut errors, "title", "Title", "   "));
        assert_eq!(errors[0].message, "Title is required");
        assert!(require(&mut errors, "title", "Title", "ok"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_check_title_length() {
        let mut errors = Vec::new();
        check_title(&mut errors, "title", "Title", &"x".repeat(MAX_TITLE_LENGTH + 1));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("no more than 200"));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("fail_count", "Fail count", "3"), Ok(3));
        assert_eq!(
            parse_count("fail_count", "Fail count", "-1").unwrap_err().message,
            "Fail count cannot be negative"
        );
        assert_eq!(
            parse_count("fail_count", "Fail count", "many").unwrap_err().message,
            "Fail count must be a valid number"
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2024-03-01T10:00:00Z").unwrap();
        let b = parse_timestamp("2024-03-01 10:00:00").unwrap();
        assert_eq!(a, b);
        let midnight = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(midnight.format("%H:%M").to_string(), "00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_fields_normalize_keys() {
        let fields: Fields = [("From Team", "Alice"), ("to-team", " Bob ")].into_iter().collect();
        assert_eq!(fields.get(&["from_person", "from_team"]), Some("Alice"));
        assert_eq!(fields.get(&["to_team"]), Some("Bob"));
        assert_eq!(fields.get(&["missing"]), None);
    }

    #[test]
    fn test_fields_parse_with_records_error() {
        let fields = Fields::new().with("date", "31/12/2024");
        let mut errors = Vec::new();
        let parsed = fields.parse_with(&["date"], &mut errors, parse_date);
        assert!(parsed.is_none());
        assert_eq!(errors[0].field, "date");
    }
}
