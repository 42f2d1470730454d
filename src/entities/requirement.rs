//! Requirement entity type

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::core::entity::{choice_enum, Record};
use crate::core::store::columns;
use crate::core::validation::{
    check_description, check_title, parse_date, FieldError, Fields, ValidationErrors,
};
use crate::entities::EntityKind;

choice_enum! {
    #[derive(Default)]
    pub enum RequirementPriority("requirement priority") {
        High => "high",
        #[default]
        Medium => "medium",
        Low => "low",
    }
}

choice_enum! {
    /// Review lifecycle of a requirement
    #[derive(Default)]
    pub enum RequirementStatus("requirement status") {
        #[default]
        New => "new",
        InReview => "in_review",
        Approved => "approved",
        Rejected => "rejected",
        Implemented => "implemented",
    }
}

/// A tracked requirement or change request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Short title
    pub title: String,

    /// Full requirement text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Date the requirement changed or is due to change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_date: Option<NaiveDate>,

    #[serde(default)]
    pub priority: RequirementPriority,

    #[serde(default)]
    pub status: RequirementStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Field replacements for [`Requirement`]
///
/// `change_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default)]
pub struct RequirementPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub change_date: Option<Option<NaiveDate>>,
    pub priority: Option<RequirementPriority>,
    pub status: Option<RequirementStatus>,
}

impl Requirement {
    /// Create a new requirement with default priority and status
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
            change_date: None,
            priority: RequirementPriority::default(),
            status: RequirementStatus::default(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Record for Requirement {
    type Patch = RequirementPatch;

    const ENTITY: EntityKind = EntityKind::Requirement;
    const KIND: &'static str = "requirement";
    const TABLE: &'static str = "requirements";
    const COLUMNS: &'static [&'static str] =
        &["title", "description", "change_date", "priority", "status"];
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
        errors
    }

    fn from_fields(fields: &Fields) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let change_date = fields.parse_with(&["change_date", "date"], &mut errors, parse_date);
        let priority: RequirementPriority = fields
            .parse_with(&["priority"], &mut errors, str::parse)
            .unwrap_or_default();
        let status: RequirementStatus = fields
            .parse_with(&["status"], &mut errors, str::parse)
            .unwrap_or_default();

        let requirement = Requirement {
            id: None,
            title: fields.text(&["title"]),
            description: fields.text(&["description", "text"]),
            change_date,
            priority,
            status,
            created_at: None,
            updated_at: None,
        };

        errors.extend(requirement.validate());
        if errors.is_empty() {
            Ok(requirement)
        } else {
            Err(errors.into())
        }
    }

    fn apply(&mut self, patch: RequirementPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(change_date) = patch.change_date {
            self.change_date = change_date;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    fn to_sql_values(&self) -> Vec<Value> {
        vec![
            columns::text(&self.title),
            columns::text(&self.description),
            columns::opt_date(self.change_date.as_ref()),
            columns::text(self.priority.as_str()),
            columns::text(self.status.as_str()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            title: row.get("title")?,
            description: columns::get_text_or_empty(row, "description")?,
            change_date: columns::get_opt_date(row, "change_date")?,
            priority: columns::get_choice(row, "priority")?,
            status: columns::get_choice(row, "status")?,
            created_at: Some(columns::get_timestamp(row, "created_at")?),
            updated_at: Some(columns::get_timestamp(row, "updated_at")?),
        })
    }

    fn csv_values(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.description.clone(),
            self.change_date
                .as_ref()
                .map(columns::format_date)
                .unwrap_or_default(),
            self.priority.to_string(),
            self.status.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_defaults() {
        let req = Requirement::new("Login", "Users can log in");
        assert_eq!(req.priority, RequirementPriority::Medium);
        assert_eq!(req.status, RequirementStatus::New);
        assert!(req.is_valid());
    }

    #[test]
    fn test_requirement_description_limit() {
        let req = Requirement::new("Login", "x".repeat(1001));
        let errors = req.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "description");
    }

    #[test]
    fn test_requirement_from_fields() {
        let fields = Fields::new()
            .with("Title", "Export")
            .with("Change Date", "2024-05-02")
            .with("Priority", "HIGH")
            .with("Status", "in review");
        let req = Requirement::from_fields(&fields).unwrap();
        assert_eq!(req.priority, RequirementPriority::High);
        assert_eq!(req.status, RequirementStatus::InReview);
        assert_eq!(req.change_date, NaiveDate::from_ymd_opt(2024, 5, 2));
    }

    #[test]
    fn test_requirement_bad_date_is_a_field_error() {
        let fields = Fields::new().with("title", "Export").with("change_date", "soon");
        let errors = Requirement::from_fields(&fields).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_field("change_date"));
    }

    #[test]
    fn test_patch_can_clear_change_date() {
        let mut req = Requirement::new("Export", "");
        req.change_date = NaiveDate::from_ymd_opt(2024, 5, 2);
        req.apply(RequirementPatch {
            change_date: Some(None),
            ..Default::default()
        });
        assert!(req.change_date.is_none());
    }

    #[test]
    fn test_requirement_serializes_status_snake_case() {
        let mut req = Requirement::new("Export", "");
        req.status = RequirementStatus::InReview;
        let yaml = serde_yml::to_string(&req).unwrap();
        assert!(yaml.contains("status: in_review"));
    }
}
