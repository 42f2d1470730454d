//! Issue entity type

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::core::entity::{choice_enum, Record};
use crate::core::store::columns;
use crate::core::validation::{
    check_description, check_length, check_title, require, FieldError, Fields, ValidationErrors,
    MAX_TITLE_LENGTH,
};
use crate::entities::EntityKind;

/// Assignee used when nobody has picked the issue up
pub const UNASSIGNED: &str = "Unassigned";

choice_enum! {
    /// Area the issue belongs to
    pub enum IssueType("issue type") {
        Infrastructure => "infrastructure",
        TestEnvironment => "test_environment",
        Application => "application",
        Performance => "performance",
        Security => "security",
    }
}

choice_enum! {
    #[derive(Default)]
    pub enum IssueSeverity("issue severity") {
        Critical => "critical",
        High => "high",
        #[default]
        Medium => "medium",
        Low => "low",
    }
}

choice_enum! {
    #[derive(Default)]
    pub enum IssueStatus("issue status") {
        #[default]
        Open => "open",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

impl IssueStatus {
    /// Open or being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, IssueStatus::Open | IssueStatus::InProgress)
    }
}

/// A reported problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(rename = "type")]
    pub issue_type: IssueType,

    #[serde(default)]
    pub severity: IssueSeverity,

    #[serde(default)]
    pub status: IssueStatus,

    /// Who raised the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,

    /// Current owner, `Unassigned` when nobody
    #[serde(default = "default_assignee")]
    pub assigned_to: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_assignee() -> String {
    UNASSIGNED.to_string()
}

/// Field replacements for [`Issue`]
///
/// `reporter: Some(None)` clears the reporter.
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub issue_type: Option<IssueType>,
    pub severity: Option<IssueSeverity>,
    pub status: Option<IssueStatus>,
    pub reporter: Option<Option<String>>,
    pub assigned_to: Option<String>,
}

impl Issue {
    /// Create an open, unassigned issue of medium severity
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        issue_type: IssueType,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
            issue_type,
            severity: IssueSeverity::default(),
            status: IssueStatus::default(),
            reporter: None,
            assigned_to: default_assignee(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Record for Issue {
    type Patch = IssuePatch;

    const ENTITY: EntityKind = EntityKind::Issue;
    const KIND: &'static str = "issue";
    const TABLE: &'static str = "issues";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "description",
        "issue_type",
        "severity",
        "status",
        "reporter",
        "assigned_to",
    ];
    const TITLE_COLUMN: &'static str = "title";

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
        &self.title
    }

    fn status(&self) -> &str {
        self.status.as_str()
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_title(&mut errors, "title", "Title", &self.title);
        check_description(&mut errors, "description", "Description", &self.description);
        if require(&mut errors, "assigned_to", "Assigned to", &self.assigned_to) {
            check_length(
                &mut errors,
                "assigned_to",
                "Assigned to",
                &self.assigned_to,
                1,
                MAX_TITLE_LENGTH,
            );
        }
        if let Some(reporter) = &self.reporter {
            check_length(&mut errors, "reporter", "Reporter", reporter, 0, MAX_TITLE_LENGTH);
        }
        errors
    }

    fn from_fields(fields: &Fields) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let issue_type: Option<IssueType> = match fields.get(&["issue_type", "type"]) {
            Some(_) => fields.parse_with(&["issue_type", "type"], &mut errors, str::parse),
            None => {
                errors.push(FieldError::new("issue_type", "Issue type is required"));
                None
            }
        };
        let severity: IssueSeverity = fields
            .parse_with(&["severity", "priority"], &mut errors, str::parse)
            .unwrap_or_default();
        let status: IssueStatus = fields
            .parse_with(&["status"], &mut errors, str::parse)
            .unwrap_or_default();

        let issue = Issue {
            id: None,
            title: fields.text(&["title"]),
            description: fields.text(&["description"]),
            issue_type: issue_type.unwrap_or(IssueType::Application),
            severity,
            status,
            reporter: fields.get(&["reporter", "reported_by"]).map(String::from),
            assigned_to: fields
                .get(&["assigned_to", "assignee"])
                .map(String::from)
                .unwrap_or_else(default_assignee),
            created_at: None,
            updated_at: None,
        };

        errors.extend(issue.validate());
        if errors.is_empty() {
            Ok(issue)
        } else {
            Err(errors.into())
        }
    }

    fn apply(&mut self, patch: IssuePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(issue_type) = patch.issue_type {
            self.issue_type = issue_type;
        }
        if let Some(severity) = patch.severity {
            self.severity = severity;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(reporter) = patch.reporter {
            self.reporter = reporter;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
    }

    fn to_sql_values(&self) -> Vec<Value> {
        vec![
            columns::text(&self.title),
            columns::text(&self.description),
            columns::text(self.issue_type.as_str()),
            columns::text(self.severity.as_str()),
            columns::text(self.status.as_str()),
            columns::opt_text(self.reporter.as_deref()),
            columns::text(&self.assigned_to),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            title: row.get("title")?,
            description: columns::get_text_or_empty(row, "description")?,
            issue_type: columns::get_choice(row, "issue_type")?,
            severity: columns::get_choice(row, "severity")?,
            status: columns::get_choice(row, "status")?,
            reporter: row.get("reporter")?,
            assigned_to: row.get("assigned_to")?,
            created_at: Some(columns::get_timestamp(row, "created_at")?),
            updated_at: Some(columns::get_timestamp(row, "updated_at")?),
        })
    }

    fn csv_values(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.description.clone(),
            self.issue_type.to_string(),
            self.severity.to_string(),
            self.status.to_string(),
            self.reporter.clone().unwrap_or_default(),
            self.assigned_to.clone(),
        ]
    }
}
