//! Test suite entity type - latest result of an automated suite

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::core::entity::{choice_enum, Record};
use crate::core::store::columns;
use crate::core::validation::{
    check_description, check_title, parse_count, parse_timestamp, FieldError, Fields,
    ValidationErrors,
};
use crate::entities::EntityKind;

choice_enum! {
    /// Outcome of the most recent run
    #[derive(Default)]
    pub enum TestSuiteStatus("test suite status") {
        #[default]
        NotRun => "not_run",
        Running => "running",
        Passed => "passed",
        Failed => "failed",
        Partial => "partial",
    }
}

impl TestSuiteStatus {
    /// Status implied by the counts of a finished run
    pub fn from_counts(passed: u32, failed: u32) -> Self {
        match (passed, failed) {
            (0, 0) => TestSuiteStatus::NotRun,
            (_, 0) => TestSuiteStatus::Passed,
            (0, _) => TestSuiteStatus::Failed,
            _ => TestSuiteStatus::Partial,
        }
    }
}

/// An automated test suite and its last recorded result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Suite name
    pub name: String,

    #[serde(default)]
    pub pass_count: u32,

    #[serde(default)]
    pub fail_count: u32,

    /// When the suite last started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: TestSuiteStatus,

    /// Notes on fixes for failing tests
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fix_notes: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Field replacements for [`TestSuite`]
#[derive(Debug, Clone, Default)]
pub struct TestSuitePatch {
    pub name: Option<String>,
    pub pass_count: Option<u32>,
    pub fail_count: Option<u32>,
    /// `Some(None)` clears the last run
    pub last_run: Option<Option<DateTime<Utc>>>,
    pub status: Option<TestSuiteStatus>,
    pub fix_notes: Option<String>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            pass_count: 0,
            fail_count: 0,
            last_run: None,
            status: TestSuiteStatus::default(),
            fix_notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Total tests in the last run
    pub fn total(&self) -> u32 {
        self.pass_count.saturating_add(self.fail_count)
    }
}

impl Record for TestSuite {
    type Patch = TestSuitePatch;

    const ENTITY: EntityKind = EntityKind::TestSuite;
    const KIND: &'static str = "test suite";
    const TABLE: &'static str = "test_suites";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "pass_count",
        "fail_count",
        "last_run",
        "status",
        "fix_notes",
    ];
    const TITLE_COLUMN: &'static str = "name";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_stored(&mut self, id: i64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.id = Some(id);
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &str {
        self.status.as_str()
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_title(&mut errors, "name", "Suite name", &self.name);
        check_description(&mut errors, "fix_notes", "Fix notes", &self.fix_notes);
        errors
    }

    fn from_fields(fields: &Fields) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let mut count = |keys: &[&str], label: &str| -> u32 {
            match fields.get(keys) {
                Some(raw) => parse_count(keys[0], label, raw).unwrap_or_else(|e| {
                    errors.push(e);
                    0
                }),
                None => 0,
            }
        };
        let pass_count = count(&["pass_count", "passed", "passes"], "Pass count");
        let fail_count = count(&["fail_count", "failed", "failures"], "Fail count");

        let last_run = fields.parse_with(&["last_run"], &mut errors, parse_timestamp);
        let status: TestSuiteStatus = fields
            .parse_with(&["status"], &mut errors, str::parse)
            .unwrap_or_default();

        let suite = TestSuite {
            id: None,
            name: fields.text(&["name", "suite_name", "title"]),
            pass_count,
            fail_count,
            last_run,
            status,
            fix_notes: fields.text(&["fix_notes", "notes"]),
            created_at: None,
            updated_at: None,
        };

        errors.extend(suite.validate());
        if errors.is_empty() {
            Ok(suite)
        } else {
            Err(errors.into())
        }
    }

    fn apply(&mut self, patch: TestSuitePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(pass_count) = patch.pass_count {
            self.pass_count = pass_count;
        }
        if let Some(fail_count) = patch.fail_count {
            self.fail_count = fail_count;
        }
        if let Some(last_run) = patch.last_run {
            self.last_run = last_run;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(fix_notes) = patch.fix_notes {
            self.fix_notes = fix_notes;
        }
    }

    fn to_sql_values(&self) -> Vec<Value> {
        vec![
            columns::text(&self.name),
            columns::integer(self.pass_count),
            columns::integer(self.fail_count),
            columns::opt_timestamp(self.last_run.as_ref()),
            columns::text(self.status.as_str()),
            columns::text(&self.fix_notes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            pass_count: columns::get_count(row, "pass_count")?,
            fail_count: columns::get_count(row, "fail_count")?,
            last_run: columns::get_opt_timestamp(row, "last_run")?,
            status: columns::get_choice(row, "status")?,
            fix_notes: columns::get_text_or_empty(row, "fix_notes")?,
            created_at: Some(columns::get_timestamp(row, "created_at")?),
            updated_at: Some(columns::get_timestamp(row, "updated_at")?),
        })
    }

    fn csv_values(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.pass_count.to_string(),
            self.fail_count.to_string(),
            self.last_run
                .as_ref()
                .map(columns::format_timestamp)
                .unwrap_or_default(),
            self.status.to_string(),
            self.fix_notes.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_counts() {
        assert_eq!(TestSuiteStatus::from_counts(0, 0), TestSuiteStatus::NotRun);
        assert_eq!(TestSuiteStatus::from_counts(12, 0), TestSuiteStatus::Passed);
        assert_eq!(TestSuiteStatus::from_counts(0, 3), TestSuiteStatus::Failed);
        assert_eq!(TestSuiteStatus::from_counts(9, 3), TestSuiteStatus::Partial);
    }

    #[test]
    fn test_suite_from_fields_rejects_negative_counts() {
        let fields = Fields::new()
            .with("Name", "smoke")
            .with("Failures", "-2")
            .with("Pass Count", "abc");
        let errors = TestSuite::from_fields(&fields).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.has_field("fail_count"));
        assert!(errors.has_field("pass_count"));
    }

    #[test]
    fn test_suite_from_fields_parses_last_run() {
        let fields = Fields::new()
            .with("name", "nightly")
            .with("last_run", "2024-06-01 22:15")
            .with("status", "Not Run");
        let suite = TestSuite::from_fields(&fields).unwrap();
        assert_eq!(suite.status, TestSuiteStatus::NotRun);
        assert_eq!(
            suite.last_run.map(|t| t.format("%H:%M").to_string()),
            Some("22:15".to_string())
        );
    }

    #[test]
    fn test_suite_requires_name() {
        let suite = TestSuite::new("  ");
        let errors = suite.validate();
        assert_eq!(errors[0].message, "Suite name is required");
    }

    #[test]
    fn test_total_counts() {
        let mut suite = TestSuite::new("smoke");
        suite.pass_count = 7;
        suite.fail_count = 2;
        assert_eq!(suite.total(), 9);
    }
}
