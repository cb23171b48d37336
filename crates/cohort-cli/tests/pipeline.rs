//! End-to-end reconciliation runs against temporary SQLite stores.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::{DataFrame, IntoColumn, NamedFrom, Series};

use cohort_cli::cli::RunArgs;
use cohort_cli::commands::run_reconcile;
use cohort_model::Version;
use cohort_store::{Database, init_changelog, read_changelog};

/// (uuid, job_id, num_course_taken) per student; other fields are valid
/// constants.
fn students_frame(rows: &[(&str, Option<f64>, Option<f64>)]) -> DataFrame {
    DataFrame::new(vec![
        Series::new(
            "uuid".into(),
            rows.iter().map(|r| r.0.to_string()).collect::<Vec<_>>(),
        )
        .into_column(),
        Series::new("name".into(), vec!["Ada Lovelace"; rows.len()]).into_column(),
        Series::new("dob".into(), vec!["1990-01-01"; rows.len()]).into_column(),
        Series::new("sex".into(), vec!["F"; rows.len()]).into_column(),
        Series::new(
            "contact_info".into(),
            vec![r#"{"email":"ada@example.com","phone":"555-0100"}"#; rows.len()],
        )
        .into_column(),
        Series::new(
            "mailing_address".into(),
            vec!["1 Main St, Springfield, IL, 62701"; rows.len()],
        )
        .into_column(),
        Series::new(
            "job_id".into(),
            rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        )
        .into_column(),
        Series::new(
            "num_course_taken".into(),
            rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        )
        .into_column(),
        Series::new("current_career_path_id".into(), vec![Some(2.0); rows.len()]).into_column(),
        Series::new("time_spent_hrs".into(), vec![Some(4.5); rows.len()]).into_column(),
    ])
    .expect("students frame")
}

fn courses_frame() -> DataFrame {
    DataFrame::new(vec![
        Series::new("career_path_id".into(), vec![2i64]).into_column(),
        Series::new("career_path_name".into(), vec!["data science"]).into_column(),
        Series::new("hours_to_complete".into(), vec![20.0]).into_column(),
    ])
    .expect("courses frame")
}

fn jobs_frame() -> DataFrame {
    DataFrame::new(vec![
        Series::new("job_id".into(), vec![1i64]).into_column(),
        Series::new("job_category".into(), vec!["engineering"]).into_column(),
        Series::new("avg_salary".into(), vec![90000.0]).into_column(),
    ])
    .expect("jobs frame")
}

fn seed_source(dir: &Path, students: &DataFrame) -> PathBuf {
    let path = dir.join("source.db");
    let mut db = Database::open(&path).expect("open source");
    db.append_rows("students", students, None).expect("seed students");
    db.append_rows("courses", &courses_frame(), None)
        .expect("seed courses");
    db.append_rows("student_jobs", &jobs_frame(), None)
        .expect("seed jobs");
    path
}

fn run_args(dir: &Path, source_db: &Path, dry_run: bool) -> RunArgs {
    RunArgs {
        source_db: source_db.to_path_buf(),
        cleansed_db: Some(dir.join("cleansed.db")),
        changelog: Some(dir.join("changelog.md")),
        snapshot: Some(dir.join("cleansed.csv")),
        as_of: Some(NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")),
        dry_run,
    }
}

#[test]
fn first_run_commits_and_bumps_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = seed_source(
        dir.path(),
        &students_frame(&[
            ("a", Some(1.0), Some(5.0)),
            ("b", Some(1.0), Some(3.0)),
            ("c", None, Some(2.0)),
        ]),
    );
    init_changelog(&dir.path().join("changelog.md")).expect("init");

    let result = run_reconcile(&run_args(dir.path(), &source, false)).expect("run");
    assert_eq!(result.records_committed, 2);
    assert_eq!(result.records_quarantined, 1);
    assert_eq!(result.total_cleansed, 2);
    assert_eq!(result.total_quarantined, 1);
    assert_eq!(result.version_after, Version::new(0, 0, 1));

    let log = read_changelog(&dir.path().join("changelog.md")).expect("changelog");
    assert_eq!(log.version(), Version::new(0, 0, 1));

    let snapshot = std::fs::read_to_string(dir.path().join("cleansed.csv")).expect("snapshot");
    assert_eq!(snapshot.lines().count(), 3);

    let store = Database::open(&dir.path().join("cleansed.db")).expect("open store");
    assert_eq!(store.row_count("cleansed").expect("count"), 2);
    assert_eq!(store.row_count("quarantine").expect("count"), 1);
}

#[test]
fn second_run_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = seed_source(
        dir.path(),
        &students_frame(&[("a", Some(1.0), Some(5.0)), ("b", None, Some(2.0))]),
    );
    init_changelog(&dir.path().join("changelog.md")).expect("init");

    run_reconcile(&run_args(dir.path(), &source, false)).expect("first run");
    let second = run_reconcile(&run_args(dir.path(), &source, false)).expect("second run");

    // The quarantined record re-enters the delta but its keyed write is
    // ignored; nothing is committed and the version does not move.
    assert_eq!(second.delta_rows, 1);
    assert_eq!(second.records_committed, 0);
    assert_eq!(second.records_quarantined, 0);
    assert_eq!(second.version_after, Version::new(0, 0, 1));
    assert_eq!(second.total_cleansed, 1);
    assert_eq!(second.total_quarantined, 1);
}

#[test]
fn new_batch_commits_against_existing_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = seed_source(dir.path(), &students_frame(&[("a", Some(1.0), Some(5.0))]));
    init_changelog(&dir.path().join("changelog.md")).expect("init");

    run_reconcile(&run_args(dir.path(), &source, false)).expect("first run");

    let mut db = Database::open(&source).expect("reopen source");
    db.append_rows(
        "students",
        &students_frame(&[("z", Some(1.0), Some(2.0))]),
        None,
    )
    .expect("append student");

    // The second batch must pass the schema check against the dtypes the
    // first commit round-tripped through the store.
    let second = run_reconcile(&run_args(dir.path(), &source, false)).expect("second run");
    assert_eq!(second.delta_rows, 1);
    assert_eq!(second.records_committed, 1);
    assert_eq!(second.total_cleansed, 2);
    assert_eq!(second.version_after, Version::new(0, 0, 2));

    let log = read_changelog(&dir.path().join("changelog.md")).expect("changelog");
    assert_eq!(log.version(), Version::new(0, 0, 2));

    let store = Database::open(&dir.path().join("cleansed.db")).expect("open store");
    assert_eq!(store.row_count("cleansed").expect("count"), 2);
}

#[test]
fn quarantine_only_run_persists_but_does_not_bump() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = seed_source(dir.path(), &students_frame(&[("a", None, None)]));
    init_changelog(&dir.path().join("changelog.md")).expect("init");

    let result = run_reconcile(&run_args(dir.path(), &source, false)).expect("run");
    assert_eq!(result.records_committed, 0);
    assert_eq!(result.records_quarantined, 1);
    assert_eq!(result.version_after, Version::new(0, 0, 0));
    assert!(result.snapshot.is_none());
    assert!(!dir.path().join("cleansed.csv").exists());

    let store = Database::open(&dir.path().join("cleansed.db")).expect("open store");
    assert_eq!(store.row_count("quarantine").expect("count"), 1);
    assert!(!store.table_exists("cleansed").expect("exists"));
}

#[test]
fn unknown_job_id_aborts_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = seed_source(dir.path(), &students_frame(&[("a", Some(99.0), Some(5.0))]));
    init_changelog(&dir.path().join("changelog.md")).expect("init");

    let error = run_reconcile(&run_args(dir.path(), &source, false)).unwrap_err();
    assert!(error.to_string().contains("job_id"));

    let log = read_changelog(&dir.path().join("changelog.md")).expect("changelog");
    assert_eq!(log.version(), Version::new(0, 0, 0));

    // The store is created on first write, so a run that aborted before
    // writing anything must not leave an empty database behind.
    assert!(!dir.path().join("cleansed.db").exists());
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = seed_source(
        dir.path(),
        &students_frame(&[("a", Some(1.0), Some(5.0)), ("b", None, Some(2.0))]),
    );
    init_changelog(&dir.path().join("changelog.md")).expect("init");

    let result = run_reconcile(&run_args(dir.path(), &source, true)).expect("dry run");
    assert!(result.dry_run);
    assert_eq!(result.records_committed, 1);
    assert_eq!(result.records_quarantined, 1);
    assert_eq!(result.version_after, Version::new(0, 0, 1));

    assert!(!dir.path().join("cleansed.db").exists());
    assert!(!dir.path().join("cleansed.csv").exists());
    let log = read_changelog(&dir.path().join("changelog.md")).expect("changelog");
    assert_eq!(log.version(), Version::new(0, 0, 0));
}

#[test]
fn missing_changelog_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = seed_source(dir.path(), &students_frame(&[("a", Some(1.0), Some(5.0))]));

    assert!(run_reconcile(&run_args(dir.path(), &source, false)).is_err());
}
