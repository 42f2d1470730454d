//! Business service - the façade every front-end calls
//!
//! Each method is one synchronous request: validate, hit the store once (or a
//! handful of times for aggregates), return. Status changes trigger a
//! best-effort notification whose failure is logged and otherwise ignored.

use std::collections::BTreeMap;

use crate::core::config::Config;
use crate::core::dashboard::{merge_recent, Activity, Dashboard, DashboardStats};
use crate::core::entity::Record;
use crate::core::error::{BmsError, Result};
use crate::core::store::{columns, ListFilter, SortOrder, Store};
use crate::core::validation::Fields;
use crate::entities::{
    EntityKind, Handover, HandoverStatus, Issue, IssueSeverity, IssueStatus, IssueType,
    Requirement, RequirementPriority, RequirementStatus, TestSuite, TestSuitePatch,
    TestSuiteStatus,
};
use crate::notify::{Notifier, StatusChange};

/// Allowed values per filterable field, keyed by field name
pub type FilterOptions = BTreeMap<&'static str, Vec<&'static str>>;

pub struct BmsService {
    store: Store,
    notifier: Notifier,
    config: Config,
}

impl BmsService {
    pub fn new(store: Store, notifier: Notifier, config: Config) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Open the configured database and notifier
    ///
    /// A notifier that cannot be built (bad templates) is replaced by a
    /// disabled one; the store must open.
    pub fn open(config: Config) -> Result<Self> {
        let store = Store::open(&config.database_path())?;
        let notifier = Notifier::from_config(&config).unwrap_or_else(|e| {
            log::warn!("notifications disabled: {}", e);
            Notifier::disabled()
        });
        Ok(Self::new(store, notifier, config))
    }

    /// In-memory store, notifications off
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(
            Store::open_in_memory()?,
            Notifier::disabled(),
            Config::default(),
        ))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =====================================================================
    // CRUD
    // =====================================================================

    pub fn create<R: Record>(&self, record: R) -> Result<R> {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(BmsError::validation(R::KIND, errors));
        }
        let created = self.store.create(record)?;
        log::info!(
            "created {} {}: {}",
            R::KIND,
            created.id().unwrap_or_default(),
            created.title()
        );
        Ok(created)
    }

    /// Build a record from form or CSV fields, then create it
    pub fn create_from_fields<R: Record>(&self, fields: &Fields) -> Result<R> {
        let record = R::from_fields(fields).map_err(|e| BmsError::validation(R::KIND, e))?;
        self.create(record)
    }

    pub fn get<R: Record>(&self, id: i64) -> Result<R> {
        self.store.get(id)
    }

    pub fn list<R: Record>(&self, filter: &ListFilter) -> Result<Vec<R>> {
        self.store.list(filter)
    }

    pub fn count<R: Record>(&self, filter: &ListFilter) -> Result<usize> {
        self.store.count::<R>(filter)
    }

    /// Apply a patch; notifies recipients when the status changed
    pub fn update<R: Record>(&self, id: i64, patch: R::Patch) -> Result<R> {
        let before: R = self.store.get(id)?;
        let after = self.store.update::<R>(id, patch)?;
        log::info!("updated {} {}", R::KIND, id);

        if before.status() != after.status() {
            self.notify_status_change(&before, &after);
        }
        Ok(after)
    }

    pub fn delete<R: Record>(&self, id: i64) -> Result<()> {
        self.store.delete::<R>(id)?;
        log::info!("deleted {} {}", R::KIND, id);
        Ok(())
    }

    fn notify_status_change<R: Record>(&self, before: &R, after: &R) {
        let (Some(id), Some(changed_at)) = (after.id(), after.updated_at()) else {
            return;
        };
        let change = StatusChange {
            kind: R::ENTITY,
            id,
            title: after.title().to_string(),
            from_status: before.status().to_string(),
            to_status: after.status().to_string(),
            changed_at,
        };
        if let Err(e) = self.notifier.notify_status_change(&change) {
            log::warn!(
                "failed to send status notification for {} {}: {}",
                R::KIND,
                id,
                e
            );
        }
    }

    // =====================================================================
    // Test suites
    // =====================================================================

    /// Mark a suite as running now
    pub fn rerun_test_suite(&self, id: i64) -> Result<TestSuite> {
        self.update::<TestSuite>(
            id,
            TestSuitePatch {
                last_run: Some(Some(columns::now())),
                status: Some(TestSuiteStatus::Running),
                ..Default::default()
            },
        )
    }

    /// Store the counts of a finished run and derive the status from them
    pub fn record_test_run(&self, id: i64, passed: u32, failed: u32) -> Result<TestSuite> {
        self.update::<TestSuite>(
            id,
            TestSuitePatch {
                pass_count: Some(passed),
                fail_count: Some(failed),
                last_run: Some(Some(columns::now())),
                status: Some(TestSuiteStatus::from_counts(passed, failed)),
                ..Default::default()
            },
        )
    }

    // =====================================================================
    // Dashboard
    // =====================================================================

    pub fn stats(&self) -> Result<DashboardStats> {
        Ok(DashboardStats {
            pending_handovers: self.store.count::<Handover>(
                &ListFilter::new().eq("status", HandoverStatus::Pending),
            )?,
            open_issues: self
                .store
                .count::<Issue>(&ListFilter::new().eq("status", IssueStatus::Open))?,
            failed_suites: self
                .store
                .count::<TestSuite>(&ListFilter::new().eq("status", TestSuiteStatus::Failed))?,
            total_requirements: self.store.count::<Requirement>(&ListFilter::new())?,
        })
    }

    /// The `limit` most recently updated records across every kind
    pub fn recent_activity(&self, limit: usize) -> Result<Vec<Activity>> {
        let mut activities = Vec::new();
        self.collect_activity::<Handover>(limit, &mut activities)?;
        self.collect_activity::<Requirement>(limit, &mut activities)?;
        self.collect_activity::<Issue>(limit, &mut activities)?;
        self.collect_activity::<TestSuite>(limit, &mut activities)?;
        Ok(merge_recent(activities, limit))
    }

    fn collect_activity<R: Record>(&self, limit: usize, into: &mut Vec<Activity>) -> Result<()> {
        let filter = ListFilter::new()
            .order(SortOrder::RecentlyUpdated)
            .limit(limit);
        let records: Vec<R> = self.store.list(&filter)?;
        into.extend(records.iter().filter_map(Activity::from_record));
        Ok(())
    }

    pub fn dashboard(&self, recent_limit: usize) -> Result<Dashboard> {
        let mut status_counts = BTreeMap::new();
        status_counts.insert(EntityKind::Handover, self.store.status_counts::<Handover>()?);
        status_counts.insert(
            EntityKind::Requirement,
            self.store.status_counts::<Requirement>()?,
        );
        status_counts.insert(EntityKind::Issue, self.store.status_counts::<Issue>()?);
        status_counts.insert(EntityKind::TestSuite, self.store.status_counts::<TestSuite>()?);

        Ok(Dashboard {
            stats: self.stats()?,
            status_counts,
            recent: self.recent_activity(recent_limit)?,
        })
    }

    /// The `n` most recently created records of one kind
    pub fn recent<R: Record>(&self, n: usize) -> Result<Vec<R>> {
        self.store
            .list(&ListFilter::new().order(SortOrder::Newest).limit(n))
    }

    /// Every enum's allowed values, for filter pickers
    pub fn filter_options() -> FilterOptions {
        let mut options = FilterOptions::new();
        options.insert("handover_status", HandoverStatus::values());
        options.insert("requirement_status", RequirementStatus::values());
        options.insert("requirement_priority", RequirementPriority::values());
        options.insert("issue_type", IssueType::values());
        options.insert("issue_severity", IssueSeverity::values());
        options.insert("issue_status", IssueStatus::values());
        options.insert("test_suite_status", TestSuiteStatus::values());
        options
    }
}
