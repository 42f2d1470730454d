//! Dashboard aggregates

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::entity::Record;
use crate::entities::EntityKind;

/// Headline counts shown at the top of the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub pending_handovers: usize,
    pub open_issues: usize,
    pub failed_suites: usize,
    pub total_requirements: usize,
}

impl DashboardStats {
    /// `(label, value)` pairs in display order
    pub fn rows(&self) -> [(&'static str, usize); 4] {
        [
            ("Pending Handovers", self.pending_handovers),
            ("Open Issues", self.open_issues),
            ("Failed Test Suites", self.failed_suites),
            ("Total Requirements", self.total_requirements),
        ]
    }
}

/// One entry in the recent-activity feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub kind: EntityKind,
    pub id: i64,
    pub title: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Activity entry for a stored record (`None` if it was never stored)
    pub fn from_record<R: Record>(record: &R) -> Option<Self> {
        Some(Self {
            kind: R::ENTITY,
            id: record.id()?,
            title: record.title().to_string(),
            status: record.status().to_string(),
            updated_at: record.updated_at()?,
        })
    }
}

/// Everything `bms status` shows
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    /// Record count per status, per record kind
    pub status_counts: BTreeMap<EntityKind, BTreeMap<String, usize>>,
    /// Most recently updated records across all kinds, newest first
    pub recent: Vec<Activity>,
}

/// Merge per-kind activity lists into one feed of at most `limit` entries
pub fn merge_recent(mut activities: Vec<Activity>, limit: usize) -> Vec<Activity> {
    activities.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| b.id.cmp(&a.id))
    });
    activities.truncate(limit);
    activities
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn activity(kind: EntityKind, id: i64, minute: u32) -> Activity {
        Activity {
            kind,
            id,
            title: format!("{} {}", kind, id),
            status: "open".to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_merge_recent_orders_newest_first_and_truncates() {
        let merged = merge_recent(
            vec![
                activity(EntityKind::Handover, 1, 5),
                activity(EntityKind::Issue, 7, 30),
                activity(EntityKind::TestSuite, 2, 10),
                activity(EntityKind::Requirement, 3, 1),
            ],
            3,
        );
        let order: Vec<(EntityKind, i64)> = merged.iter().map(|a| (a.kind, a.id)).collect();
        assert_eq!(
            order,
            vec![
                (EntityKind::Issue, 7),
                (EntityKind::TestSuite, 2),
                (EntityKind::Handover, 1)
            ]
        );
    }

    #[test]
    fn test_stats_rows_labels() {
        let stats = DashboardStats {
            open_issues: 2,
            ..Default::default()
        };
        assert_eq!(stats.rows()[1], ("Open Issues", 2));
    }
}
