//! Record trait - common interface for all persisted entity types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

use crate::core::validation::{FieldError, Fields, ValidationErrors};
use crate::entities::EntityKind;

/// Common trait for Handover, Requirement, Issue and TestSuite
///
/// The store is generic over this trait: table layout, row mapping and CSV
/// layout all come from the implementing type, so every entity gets the same
/// create/get/list/update/delete behavior.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug + PartialEq {
    /// Partial update applied by `update(id, patch)`; every field optional
    type Patch: Default + Debug;

    /// Which record type this is
    const ENTITY: EntityKind;

    /// Singular, lowercase name used in messages ("handover")
    const KIND: &'static str;

    /// Backing SQLite table
    const TABLE: &'static str;

    /// Data columns in declared order (excludes id and timestamps)
    const COLUMNS: &'static [&'static str];

    /// Column searched by `ListFilter::search`
    const TITLE_COLUMN: &'static str;

    /// Column holding the record's status enum
    const STATUS_COLUMN: &'static str = "status";

    /// Store-assigned id (`None` until created)
    fn id(&self) -> Option<i64>;

    fn created_at(&self) -> Option<DateTime<Utc>>;

    fn updated_at(&self) -> Option<DateTime<Utc>>;

    /// Populate the store-managed fields after insert/update
    fn set_stored(&mut self, id: i64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);

    /// Display title (handover title, suite name, ...)
    fn title(&self) -> &str;

    /// Status as stored (snake_case)
    fn status(&self) -> &str;

    /// Check every field rule; empty list means valid
    fn validate(&self) -> Vec<FieldError>;

    /// Build a record from a name → value mapping
    ///
    /// Unknown keys are ignored. Unparseable values and failed rules are
    /// reported together.
    fn from_fields(fields: &Fields) -> Result<Self, ValidationErrors>;

    /// Overwrite the fields present in `patch`
    fn apply(&mut self, patch: Self::Patch);

    /// SQL values for [`Record::COLUMNS`], in order
    fn to_sql_values(&self) -> Vec<rusqlite::types::Value>;

    /// Map a row selected with `id, COLUMNS..., created_at, updated_at`
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;

    /// CSV cells for [`Record::COLUMNS`], in order
    fn csv_values(&self) -> Vec<String>;

    /// CSV header: `id` followed by the data columns
    fn csv_headers() -> Vec<&'static str> {
        let mut headers = Vec::with_capacity(Self::COLUMNS.len() + 1);
        headers.push("id");
        headers.extend_from_slice(Self::COLUMNS);
        headers
    }

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Normalize a user-supplied enum value: `"In Progress"` -> `"in_progress"`
pub fn normalize_choice(value: &str) -> String {
    crate::core::validation::normalize_key(value)
}

/// Declare a closed set of string values stored as snake_case text
///
/// Generates the enum with serde support, `ALL`, `as_str`, `values`,
/// `Display` and a lenient `FromStr` (case-insensitive, spaces or hyphens
/// accepted in place of underscores).
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn values() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = $crate::core::entity::normalize_choice(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == normalized)
                    .ok_or_else(|| {
                        format!(
                            "Unknown {}: '{}' (expected one of: {})",
                            $label,
                            s.trim(),
                            Self::values().join(", ")
                        )
                    })
            }
        }
    };
}

pub(crate) use choice_enum;
