use chrono::NaiveDate;
use tempfile::tempdir;

use super::*;
use crate::core::error::BmsError;
use crate::core::validation::parse_timestamp;
use crate::entities::{
    Handover, HandoverPatch, HandoverStatus, Issue, IssueSeverity, IssueType, Requirement,
    TestSuite, TestSuitePatch,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn handover(title: &str) -> Handover {
    Handover::new(title, "Alice", "Bob", day())
}

#[test]
fn test_open_creates_file_and_schema() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("nested").join("bms.db");

    let store = Store::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    assert_eq!(store.path(), Some(path.as_path()));
}

#[test]
fn test_reopen_keeps_records() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("bms.db");

    let id = {
        let store = Store::open(&path).unwrap();
        store.create(handover("Night shift")).unwrap().id.unwrap()
    };

    let store = Store::open(&path).unwrap();
    let loaded: Handover = store.get(id).unwrap();
    assert_eq!(loaded.title, "Night shift");
}

#[test]
fn test_newer_schema_is_refused() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("bms.db");
    {
        let store = Store::open(&path).unwrap();
        store
            .conn
            .execute("INSERT INTO schema_version (version) VALUES (99)", [])
            .unwrap();
    }

    let err = Store::open(&path).err().unwrap();
    assert!(matches!(err, BmsError::Store(_)));
}

#[test]
fn test_create_then_get_returns_equal_record() {
    let store = Store::open_in_memory().unwrap();
    let mut input = handover("Shift A→B");
    input.documents = vec!["runbook.pdf".to_string()];

    let created = store.create(input.clone()).unwrap();
    assert_eq!(created.id, Some(1));
    assert!(created.created_at.is_some());
    assert_eq!(created.created_at, created.updated_at);

    let loaded: Handover = store.get(1).unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.documents, input.documents);
}

#[test]
fn test_create_rejects_invalid_record() {
    let store = Store::open_in_memory().unwrap();
    let err = store.create(Requirement::new("", "")).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.count::<Requirement>(&ListFilter::new()).unwrap(), 0);
}

#[test]
fn test_ids_are_not_reused() {
    let store = Store::open_in_memory().unwrap();
    let first = store.create(handover("one")).unwrap().id.unwrap();
    store.delete::<Handover>(first).unwrap();
    let second = store.create(handover("two")).unwrap().id.unwrap();
    assert!(second > first);
}

#[test]
fn test_get_missing_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let err = store.get::<Issue>(42).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "No issue with id 42");
}

#[test]
fn test_delete_then_get_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let id = store.create(handover("Shift A→B")).unwrap().id.unwrap();
    assert_eq!(store.list::<Handover>(&ListFilter::new()).unwrap().len(), 1);

    store.delete::<Handover>(id).unwrap();
    assert!(store.get::<Handover>(id).unwrap_err().is_not_found());
    assert!(store.delete::<Handover>(id).unwrap_err().is_not_found());
    assert!(!store.exists::<Handover>(id).unwrap());
}

#[test]
fn test_update_missing_leaves_store_unchanged() {
    let store = Store::open_in_memory().unwrap();
    store.create(handover("keep")).unwrap();

    let patch = HandoverPatch {
        title: Some("changed".to_string()),
        ..Default::default()
    };
    let err = store.update::<Handover>(7, patch).unwrap_err();
    assert!(err.is_not_found());

    let all: Vec<Handover> = store.list(&ListFilter::new()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "keep");
}

#[test]
fn test_update_applies_patch_and_bumps_updated_at() {
    let store = Store::open_in_memory().unwrap();
    let created = store.create(TestSuite::new("nightly")).unwrap();
    let id = created.id.unwrap();

    let updated = store
        .update::<TestSuite>(
            id,
            TestSuitePatch {
                fail_count: Some(3),
                fix_notes: Some("flaky login test".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(updated.fail_count, 3);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(store.get::<TestSuite>(id).unwrap(), updated);
}

#[test]
fn test_update_rejects_invalid_patch() {
    let store = Store::open_in_memory().unwrap();
    let id = store.create(handover("Shift")).unwrap().id.unwrap();

    let err = store
        .update::<Handover>(
            id,
            HandoverPatch {
                from_person: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.get::<Handover>(id).unwrap().from_person, "Alice");
}

#[test]
fn test_list_length_tracks_creates_and_deletes() {
    let store = Store::open_in_memory().unwrap();
    let ids: Vec<i64> = (0..5)
        .map(|i| store.create(handover(&format!("shift {}", i))).unwrap().id.unwrap())
        .collect();
    store.delete::<Handover>(ids[1]).unwrap();
    store.delete::<Handover>(ids[3]).unwrap();

    let titles: Vec<String> = store
        .list::<Handover>(&ListFilter::new())
        .unwrap()
        .into_iter()
        .map(|h| h.title)
        .collect();
    assert_eq!(titles, vec!["shift 0", "shift 2", "shift 4"]);
}

#[test]
fn test_list_filter_and_search() {
    let store = Store::open_in_memory().unwrap();
    let mut critical = Issue::new("Database 100% CPU", "", IssueType::Performance);
    critical.severity = IssueSeverity::Critical;
    store.create(critical).unwrap();
    store
        .create(Issue::new("Login page slow", "", IssueType::Performance))
        .unwrap();
    store
        .create(Issue::new("Cert expired", "", IssueType::Security))
        .unwrap();

    let perf: Vec<Issue> = store
        .list(&ListFilter::new().eq("issue_type", IssueType::Performance))
        .unwrap();
    assert_eq!(perf.len(), 2);

    let critical: Vec<Issue> = store
        .list(
            &ListFilter::new()
                .eq("issue_type", "performance")
                .eq("severity", IssueSeverity::Critical),
        )
        .unwrap();
    assert_eq!(critical.len(), 1);

    let searched: Vec<Issue> = store.list(&ListFilter::new().search("LOGIN")).unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].title, "Login page slow");

    // LIKE wildcards in the search text match literally
    let percent: Vec<Issue> = store.list(&ListFilter::new().search("100%")).unwrap();
    assert_eq!(percent.len(), 1);
    let underscore: Vec<Issue> = store.list(&ListFilter::new().search("_")).unwrap();
    assert!(underscore.is_empty());
}

#[test]
fn test_list_unknown_column_is_rejected() {
    let store = Store::open_in_memory().unwrap();
    let err = store
        .list::<Issue>(&ListFilter::new().eq("1=1; DROP TABLE issues; --", "x"))
        .unwrap_err();
    assert!(matches!(err, BmsError::UnknownColumn { .. }));
}

#[test]
fn test_list_recent_order_and_limit() {
    let store = Store::open_in_memory().unwrap();
    for title in ["a", "b", "c"] {
        store.create(handover(title)).unwrap();
    }
    std::thread::sleep(std::time::Duration::from_millis(5));
    store
        .update::<Handover>(
            1,
            HandoverPatch {
                status: Some(HandoverStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap();

    let recent: Vec<Handover> = store
        .list(
            &ListFilter::new()
                .order(SortOrder::RecentlyUpdated)
                .limit(2),
        )
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].title, "a");
}

#[test]
fn test_list_newest_follows_id_not_clock() {
    let store = Store::open_in_memory().unwrap();
    for title in ["a", "b", "c"] {
        store.create(handover(title)).unwrap();
    }
    // Skewed clock: the first record claims the latest creation time
    store
        .conn
        .execute(
            "UPDATE handovers SET created_at = '2999-01-01T00:00:00.000000Z' WHERE id = 1",
            [],
        )
        .unwrap();

    let newest: Vec<Handover> = store
        .list(&ListFilter::new().order(SortOrder::Newest))
        .unwrap();
    let titles: Vec<&str> = newest.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, vec!["c", "b", "a"]);
}

#[test]
fn test_sub_microsecond_timestamps_round_trip() {
    let store = Store::open_in_memory().unwrap();
    let mut suite = TestSuite::new("Nightly");
    suite.last_run = Some(parse_timestamp("2024-03-01T10:00:00.123456789Z").unwrap());

    let created = store.create(suite).unwrap();
    let loaded: TestSuite = store.get(created.id.unwrap()).unwrap();
    assert_eq!(loaded, created);
    assert_eq!(
        created.last_run.map(|ts| ts.timestamp_subsec_nanos()),
        Some(123_456_000)
    );

    let updated = store
        .update::<TestSuite>(
            loaded.id.unwrap(),
            TestSuitePatch {
                last_run: Some(Some(parse_timestamp("2024-03-02T08:00:00.000000999Z").unwrap())),
                ..Default::default()
            },
        )
        .unwrap();
    let reloaded: TestSuite = store.get(updated.id.unwrap()).unwrap();
    assert_eq!(reloaded, updated);
}

#[test]
fn test_status_counts() {
    let store = Store::open_in_memory().unwrap();
    store.create(handover("one")).unwrap();
    store.create(handover("two")).unwrap();
    let mut blocked = handover("three");
    blocked.status = HandoverStatus::Blocked;
    store.create(blocked).unwrap();

    let counts = store.status_counts::<Handover>().unwrap();
    assert_eq!(counts.get("pending"), Some(&2));
    assert_eq!(counts.get("blocked"), Some(&1));
    assert_eq!(counts.get("completed"), None);
}

#[test]
fn test_backup_then_restore_brings_records_back() {
    let tmp = tempdir().unwrap();
    let mut store = Store::open(&tmp.path().join("bms.db")).unwrap();
    let kept = store.create(handover("Before backup")).unwrap();

    let backup = tmp.path().join("snapshot.db");
    store.backup_to(&backup).unwrap();

    store.create(handover("After backup")).unwrap();
    assert_eq!(store.total_records().unwrap(), 2);

    store.restore_from(&backup).unwrap();
    let all: Vec<Handover> = store.list(&ListFilter::default()).unwrap();
    assert_eq!(all, vec![kept]);
    assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
}

#[test]
fn test_backup_refuses_existing_target() {
    let tmp = tempdir().unwrap();
    let store = Store::open(&tmp.path().join("bms.db")).unwrap();
    let target = tmp.path().join("taken.db");
    std::fs::write(&target, "keep me").unwrap();

    assert!(matches!(store.backup_to(&target), Err(BmsError::Store(_))));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "keep me");
}

#[test]
fn test_restore_rejects_non_bms_files() {
    let tmp = tempdir().unwrap();
    let mut store = Store::open(&tmp.path().join("bms.db")).unwrap();
    let id = store.create(handover("Survives")).unwrap().id.unwrap();

    let garbage = tmp.path().join("garbage.db");
    std::fs::write(&garbage, "this is not sqlite").unwrap();
    assert!(store.restore_from(&garbage).is_err());

    let foreign = tmp.path().join("foreign.db");
    rusqlite::Connection::open(&foreign)
        .unwrap()
        .execute_batch("CREATE TABLE t (x INTEGER);")
        .unwrap();
    assert!(matches!(store.restore_from(&foreign), Err(BmsError::Store(_))));

    assert!(matches!(
        store.restore_from(&tmp.path().join("missing.db")),
        Err(BmsError::Store(_))
    ));

    let survivor: Handover = store.get(id).unwrap();
    assert_eq!(survivor.title, "Survives");
}

#[test]
fn test_restore_rejects_newer_schema() {
    let tmp = tempdir().unwrap();
    let newer = tmp.path().join("newer.db");
    {
        let store = Store::open(&newer).unwrap();
        store
            .conn
            .execute("INSERT INTO schema_version (version) VALUES (99)", [])
            .unwrap();
    }

    let mut store = Store::open(&tmp.path().join("bms.db")).unwrap();
    let err = store.restore_from(&newer).unwrap_err();
    assert!(err.to_string().contains("newer"));
}

#[test]
fn test_clear_removes_everything_but_never_reuses_ids() {
    let store = Store::open_in_memory().unwrap();
    store.create(handover("One")).unwrap();
    let last = store.create(handover("Two")).unwrap().id.unwrap();
    store.create(Issue::new("Disk full", "", IssueType::Infrastructure)).unwrap();

    assert_eq!(store.clear().unwrap(), 3);
    assert_eq!(store.total_records().unwrap(), 0);

    let next = store.create(handover("Three")).unwrap().id.unwrap();
    assert!(next > last);
}
