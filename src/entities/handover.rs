//! Handover entity type - a shift transition between two people

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::core::entity::{choice_enum, Record};
use crate::core::store::columns;
use crate::core::validation::{
    check_description, check_title, parse_date, FieldError, Fields, ValidationErrors,
    MAX_DOCUMENTS_COUNT,
};
use crate::entities::EntityKind;

choice_enum! {
    /// Handover progress
    #[derive(Default)]
    pub enum HandoverStatus("handover status") {
        #[default]
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Blocked => "blocked",
    }
}

/// A handover from one person (or team) to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handover {
    /// Store-assigned id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Short title
    pub title: String,

    /// Person or team handing over
    pub from_person: String,

    /// Person or team receiving
    pub to_person: String,

    /// Day of the handover
    pub date: NaiveDate,

    #[serde(default)]
    pub status: HandoverStatus,

    /// Free-text notes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    /// Referenced document names or paths
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Field replacements for [`Handover`]
#[derive(Debug, Clone, Default)]
pub struct HandoverPatch {
    pub title: Option<String>,
    pub from_person: Option<String>,
    pub to_person: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<HandoverStatus>,
    pub notes: Option<String>,
    pub documents: Option<Vec<String>>,
}

impl Handover {
    /// Create a pending handover with no notes or documents
    pub fn new(
        title: impl Into<String>,
        from_person: impl Into<String>,
        to_person: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            from_person: from_person.into(),
            to_person: to_person.into(),
            date,
            status: HandoverStatus::default(),
            notes: String::new(),
            documents: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Split a document list typed as `a.pdf, b.pdf` or `a.pdf; b.pdf`
pub fn split_documents(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Record for Handover {
    type Patch = HandoverPatch;

    const ENTITY: EntityKind = EntityKind::Handover;
    const KIND: &'static str = "handover";
    const TABLE: &'static str = "handovers";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "from_person",
        "to_person",
        "date",
        "status",
        "notes",
        "documents",
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
        check_title(&mut errors, "from_person", "From person", &self.from_person);
        check_title(&mut errors, "to_person", "To person", &self.to_person);
        check_description(&mut errors, "notes", "Notes", &self.notes);
        if self.documents.len() > MAX_DOCUMENTS_COUNT {
            errors.push(FieldError::new(
                "documents",
                format!("Cannot have more than {} documents", MAX_DOCUMENTS_COUNT),
            ));
        }
        errors
    }

    fn from_fields(fields: &Fields) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let from_person = fields.text(&["from_person", "from_team", "from"]);
        let to_person = fields.text(&["to_person", "to_team", "to"]);
        let title = match fields.get(&["title"]) {
            Some(title) => title.to_string(),
            None if !from_person.is_empty() && !to_person.is_empty() => {
                format!("{} → {}", from_person, to_person)
            }
            None => String::new(),
        };

        let date = match fields.get(&["date", "handover_date"]) {
            Some(_) => fields.parse_with(&["date", "handover_date"], &mut errors, parse_date),
            None => {
                errors.push(FieldError::new("date", "Date is required"));
                None
            }
        };
        let status: HandoverStatus = fields
            .parse_with(&["status"], &mut errors, str::parse)
            .unwrap_or_default();

        let handover = Handover {
            id: None,
            title,
            from_person,
            to_person,
            date: date.unwrap_or_default(),
            status,
            notes: fields.text(&["notes", "description"]),
            documents: fields
                .get(&["documents"])
                .map(split_documents)
                .unwrap_or_default(),
            created_at: None,
            updated_at: None,
        };

        errors.extend(handover.validate());
        if errors.is_empty() {
            Ok(handover)
        } else {
            Err(errors.into())
        }
    }

    fn apply(&mut self, patch: HandoverPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(from_person) = patch.from_person {
            self.from_person = from_person;
        }
        if let Some(to_person) = patch.to_person {
            self.to_person = to_person;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(documents) = patch.documents {
            self.documents = documents;
        }
    }

    fn to_sql_values(&self) -> Vec<Value> {
        vec![
            columns::text(&self.title),
            columns::text(&self.from_person),
            columns::text(&self.to_person),
            columns::date(&self.date),
            columns::text(self.status.as_str()),
            columns::text(&self.notes),
            columns::string_list(&self.documents),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            title: row.get("title")?,
            from_person: row.get("from_person")?,
            to_person: row.get("to_person")?,
            date: columns::get_date(row, "date")?,
            status: columns::get_choice(row, "status")?,
            notes: columns::get_text_or_empty(row, "notes")?,
            documents: columns::get_string_list(row, "documents")?,
            created_at: Some(columns::get_timestamp(row, "created_at")?),
            updated_at: Some(columns::get_timestamp(row, "updated_at")?),
        })
    }

    fn csv_values(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.from_person.clone(),
            self.to_person.clone(),
            columns::format_date(&self.date),
            self.status.to_string(),
            self.notes.clone(),
            self.documents.join("; "),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_new_handover_is_valid_and_pending() {
        let ho = Handover::new("Shift A→B", "Alice", "Bob", day());
        assert!(ho.is_valid());
        assert_eq!(ho.status, HandoverStatus::Pending);
        assert!(ho.id.is_none());
    }

    #[test]
    fn test_validate_reports_each_missing_person() {
        let ho = Handover::new("Shift", "", "  ", day());
        let errors = ho.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "From person is required");
        assert_eq!(errors[1].field, "to_person");
    }

    #[test]
    fn test_validate_document_limit() {
        let mut ho = Handover::new("Shift", "Alice", "Bob", day());
        ho.documents = (0..=MAX_DOCUMENTS_COUNT).map(|i| format!("doc{}.pdf", i)).collect();
        let errors = ho.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "documents");
    }

    #[test]
    fn test_from_fields_accepts_form_labels() {
        let fields: Fields = [
            ("From Team", "Ops"),
            ("To Team", "Dev"),
            ("Date", "2024-03-01"),
            ("Status", "In Progress"),
            ("Description", "Rollout half done"),
            ("Documents", "runbook.pdf, notes.txt"),
        ]
        .into_iter()
        .collect();

        let ho = Handover::from_fields(&fields).unwrap();
        assert_eq!(ho.title, "Ops → Dev");
        assert_eq!(ho.status, HandoverStatus::InProgress);
        assert_eq!(ho.notes, "Rollout half done");
        assert_eq!(ho.documents, vec!["runbook.pdf", "notes.txt"]);
        assert_eq!(ho.date, day());
    }

    #[test]
    fn test_from_fields_collects_all_failures() {
        let fields = Fields::new()
            .with("from_person", "Alice")
            .with("status", "sideways");
        let errors = Handover::from_fields(&fields).unwrap_err();
        assert!(errors.has_field("date"));
        assert!(errors.has_field("status"));
        assert!(errors.has_field("to_person"));
    }

    #[test]
    fn test_apply_patch_only_touches_given_fields() {
        let mut ho = Handover::new("Shift", "Alice", "Bob", day());
        ho.apply(HandoverPatch {
            status: Some(HandoverStatus::Completed),
            ..Default::default()
        });
        assert_eq!(ho.status, HandoverStatus::Completed);
        assert_eq!(ho.from_person, "Alice");
    }

    #[test]
    fn test_split_documents() {
        assert_eq!(split_documents("a; b ,, c"), vec!["a", "b", "c"]);
        assert!(split_documents("  ").is_empty());
    }
}
