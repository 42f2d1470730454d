//! Integration tests for the BMS CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.
//! Every test gets its own database and config directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get a bms command isolated inside `tmp`
fn bms(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bms").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join("config"))
        .env_remove("BMS_CONFIG")
        .env_remove("BMS_DB_PATH")
        .env_remove("BMS_NOTIFY_TO")
        .env_remove("BMS_OUTBOX_DIR")
        .env_remove("BMS_SMTP_SERVER")
        .env_remove("BMS_SMTP_PORT")
        .env_remove("BMS_EMAIL_USERNAME")
        .env_remove("BMS_EMAIL_PASSWORD")
        .env_remove("BMS_BACKUP_DIR")
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(db_path(tmp));
    cmd
}

fn db_path(tmp: &TempDir) -> PathBuf {
    tmp.path().join("data").join("bms.db")
}

/// Helper to create an initialized database in a temp directory
fn setup() -> TempDir {
    let tmp = TempDir::new().unwrap();
    bms(&tmp).arg("init").assert().success();
    tmp
}

/// Run a `new` command quietly and return the printed id
fn create(tmp: &TempDir, args: &[&str]) -> String {
    let output = bms(tmp).arg("-q").args(args).output().unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn create_handover(tmp: &TempDir, from: &str, to: &str) -> String {
    create(
        tmp,
        &["ho", "new", "--from", from, "--to", to, "--date", "2024-03-01"],
    )
}

// ============================================================================
// Basics
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Business Management System"))
        .stdout(predicate::str::contains("ho"))
        .stdout(predicate::str::contains("suite"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_version() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bms"));
}

#[test]
fn test_init_creates_database_and_directory() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized BMS database"));
    assert!(db_path(&tmp).exists());
}

#[test]
fn test_init_twice_reports_existing() {
    let tmp = setup();
    bms(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

// ============================================================================
// Handovers
// ============================================================================

#[test]
fn test_handover_lifecycle() {
    let tmp = setup();

    bms(&tmp)
        .args([
            "ho", "new", "--from", "Ops", "--to", "Dev", "--date", "2024-03-01", "--doc",
            "runbook.md", "--doc", "keys.txt",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created handover 1"))
        .stdout(predicate::str::contains("Ops → Dev"));

    bms(&tmp)
        .args(["ho", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ops → Dev"))
        .stdout(predicate::str::contains("1 handovers found"));

    bms(&tmp)
        .args(["ho", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runbook.md"))
        .stdout(predicate::str::contains("2024-03-01"));

    bms(&tmp)
        .args(["ho", "edit", "1", "--status", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated handover 1"));

    bms(&tmp)
        .args(["ho", "show", "1", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"completed\""));

    bms(&tmp)
        .args(["ho", "delete", "1", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted handover 1"));

    bms(&tmp)
        .args(["ho", "list", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_handover_list_empty_hint() {
    let tmp = setup();
    bms(&tmp)
        .args(["ho", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No handovers found."))
        .stdout(predicate::str::contains("bms ho new"));
}

#[test]
fn test_handover_list_filters_by_status() {
    let tmp = setup();
    create_handover(&tmp, "Ops", "Dev");
    let id = create_handover(&tmp, "Dev", "QA");
    bms(&tmp)
        .args(["ho", "edit", &id, "--status", "blocked"])
        .assert()
        .success();

    bms(&tmp)
        .args(["ho", "list", "--status", "blocked", "--format", "id"])
        .assert()
        .success()
        .stdout(format!("{}\n", id));
}

#[test]
fn test_validation_failure_names_the_field() {
    let tmp = setup();
    bms(&tmp)
        .args(["ho", "new", "--title", "Swap", "--from", " ", "--to", "Dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid handover"))
        .stderr(predicate::str::contains("From person is required"));

    bms(&tmp)
        .args(["ho", "list", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_bad_date_is_rejected() {
    let tmp = setup();
    bms(&tmp)
        .args(["ho", "new", "--from", "Ops", "--to", "Dev", "--date", "03/01/2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("03/01/2024"));
}

#[test]
fn test_missing_record_is_not_found() {
    let tmp = setup();
    bms(&tmp)
        .args(["req", "show", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No requirement with id 42"));
}

#[test]
fn test_delete_without_yes_refuses_when_not_interactive() {
    let tmp = setup();
    let id = create_handover(&tmp, "Ops", "Dev");
    bms(&tmp)
        .args(["ho", "delete", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    bms(&tmp).args(["ho", "show", &id]).assert().success();
}

// ============================================================================
// Requirements, issues and suites
// ============================================================================

#[test]
fn test_requirement_new_and_filter() {
    let tmp = setup();
    create(&tmp, &["req", "new", "--title", "Audit log", "-p", "high"]);
    create(&tmp, &["req", "new", "--title", "Dark mode", "-p", "low"]);

    bms(&tmp)
        .args(["req", "list", "--priority", "high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Audit log"))
        .stdout(predicate::str::contains("Dark mode").not());
}

#[test]
fn test_requirement_rejects_unknown_priority() {
    let tmp = setup();
    bms(&tmp)
        .args(["req", "new", "--title", "Audit log", "-p", "urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("urgent"));
}

#[test]
fn test_issue_requires_type() {
    let tmp = setup();
    bms(&tmp)
        .args(["issue", "new", "--title", "Disk full"])
        .assert()
        .failure();
}

#[test]
fn test_issue_assign_and_unassign() {
    let tmp = setup();
    let id = create(
        &tmp,
        &["issue", "new", "--title", "Disk full", "--type", "infrastructure"],
    );

    bms(&tmp)
        .args(["issue", "assign", &id, "sam"])
        .assert()
        .success();
    bms(&tmp)
        .args(["issue", "show", &id, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"assigned_to\": \"sam\""));

    bms(&tmp).args(["issue", "assign", &id]).assert().success();
    bms(&tmp)
        .args(["issue", "show", &id, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"assigned_to\": \"Unassigned\""));
}

#[test]
fn test_suite_record_derives_status() {
    let tmp = setup();
    let id = create(&tmp, &["suite", "new", "--name", "Smoke"]);

    bms(&tmp)
        .args(["suite", "record", &id, "--passed", "8", "--failed", "2"])
        .assert()
        .success();
    bms(&tmp)
        .args(["suite", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("8 passed, 2 failed (10 total)"));

    bms(&tmp)
        .args(["suite", "list", "--failing", "--format", "id"])
        .assert()
        .success()
        .stdout(format!("{}\n", id));
}

// ============================================================================
// Dashboard, export and import
// ============================================================================

#[test]
fn test_status_json_counts() {
    let tmp = setup();
    create_handover(&tmp, "Ops", "Dev");
    create(
        &tmp,
        &["issue", "new", "--title", "Disk full", "--type", "infrastructure"],
    );
    let suite = create(&tmp, &["suite", "new", "--name", "Smoke"]);
    bms(&tmp)
        .args(["suite", "record", &suite, "--passed", "0", "--failed", "3"])
        .assert()
        .success();

    bms(&tmp)
        .args(["status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending_handovers\": 1"))
        .stdout(predicate::str::contains("\"open_issues\": 1"))
        .stdout(predicate::str::contains("\"failed_suites\": 1"))
        .stdout(predicate::str::contains("\"total_requirements\": 0"));
}

#[test]
fn test_export_handovers_to_stdout() {
    let tmp = setup();
    create_handover(&tmp, "Ops", "Dev");

    bms(&tmp)
        .args(["export", "handovers", "-o", "-"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("id,title,from_person,to_person"))
        .stdout(predicate::str::contains("Ops → Dev"));
}

#[test]
fn test_export_writes_file_into_dir() {
    let tmp = setup();
    create_handover(&tmp, "Ops", "Dev");

    bms(&tmp)
        .args(["export", "dashboard", "--dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported dashboard"));

    let files: Vec<_> = fs::read_dir(tmp.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with(".csv"));
}

#[test]
fn test_import_dry_run_writes_nothing() {
    let tmp = setup();
    let csv = tmp.path().join("reqs.csv");
    fs::write(
        &csv,
        "title,description,priority,status\nAudit log,Keep a trail,high,new\nSSO,,medium,new\n",
    )
    .unwrap();

    bms(&tmp)
        .args(["import", "req", "--dry-run"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run complete"));

    bms(&tmp)
        .args(["req", "list", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_import_reports_bad_rows() {
    let tmp = setup();
    let csv = tmp.path().join("issues.csv");
    fs::write(
        &csv,
        "title,issue_type\nDisk full,infrastructure\nBroken,teleport\n",
    )
    .unwrap();

    bms(&tmp)
        .args(["import", "issues"])
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 2 rows failed"));

    bms(&tmp)
        .args(["issue", "list", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_import_template_needs_no_file() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .args(["import", "handovers", "--template"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("title,from_person,to_person"));
}

// ============================================================================
// Database maintenance
// ============================================================================

#[test]
fn test_db_backup_list_restore() {
    let tmp = setup();
    create_handover(&tmp, "Alice", "Bob");
    let backups = tmp.path().join("snapshots");

    let output = bms(&tmp)
        .args(["-q", "db", "backup", "--dir"])
        .arg(&backups)
        .output()
        .unwrap();
    assert!(output.status.success());
    let backup = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
    assert!(backup.exists());
    assert!(backup
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("bms_backup_"));

    bms(&tmp)
        .args(["db", "list", "--format", "id", "--dir"])
        .arg(&backups)
        .assert()
        .success()
        .stdout(predicate::str::contains("bms_backup_"));

    create_handover(&tmp, "Carol", "Dan");
    bms(&tmp)
        .args(["db", "restore", "--yes", "--no-backup"])
        .arg(&backup)
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 records"));

    bms(&tmp)
        .args(["ho", "list", "--format", "id"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_db_backup_prunes_to_keep() {
    let tmp = setup();
    let backups = tmp.path().join("snapshots");
    fs::create_dir_all(&backups).unwrap();
    fs::write(backups.join("bms_backup_20200101_000000.db"), "old").unwrap();
    fs::write(backups.join("bms_backup_20200102_000000.db"), "old").unwrap();

    bms(&tmp)
        .args(["db", "backup", "--keep", "1", "--dir"])
        .arg(&backups)
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 old backup(s)"));
    assert!(!backups.join("bms_backup_20200101_000000.db").exists());
}

#[test]
fn test_db_restore_rejects_missing_file() {
    let tmp = setup();
    bms(&tmp)
        .args(["db", "restore", "--yes", "nowhere.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_db_clear_needs_confirmation() {
    let tmp = setup();
    create_handover(&tmp, "Alice", "Bob");

    bms(&tmp)
        .args(["db", "clear"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    bms(&tmp)
        .args(["db", "clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1 records"));

    bms(&tmp)
        .args(["ho", "list", "--count"])
        .assert()
        .success()
        .stdout("0\n");

    let id = create_handover(&tmp, "Carol", "Dan");
    assert_eq!(id, "2");
}

// ============================================================================
// Config, mail and completions
// ============================================================================

#[test]
fn test_config_set_then_show() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .args(["config", "set", "dashboard_limit", "9"])
        .assert()
        .success();
    bms(&tmp)
        .args(["config", "show", "dashboard_limit"])
        .assert()
        .success()
        .stdout("9\n");
}

#[test]
fn test_config_rejects_unknown_key() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .args(["config", "set", "colour", "red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_config_show_masks_password_and_picks_smtp() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .env("BMS_SMTP_SERVER", "mail.example.com")
        .env("BMS_EMAIL_USERNAME", "ops@example.com")
        .env("BMS_EMAIL_PASSWORD", "hunter2")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("hunter2").not())
        .stdout(predicate::str::contains("hu*").not())
        .stdout(predicate::str::contains("smtp (mail.example.com:587)"));
}

#[test]
fn test_mail_preview_renders_without_sending() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .args([
            "mail",
            "registration",
            "--to",
            "sam@example.com",
            "--username",
            "sam",
            "--url",
            "https://bms.example.com/verify/abc",
            "--preview",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Verify Your BMS Account"))
        .stdout(predicate::str::contains("https://bms.example.com/verify/abc"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    bms(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bms"));
}
