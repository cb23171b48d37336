use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Result, bail};
use chrono::Local;
use tracing::{info, info_span};

use cohort_model::Version;
use cohort_model::columns::UUID;
use cohort_store::{
    CLEANSED_TABLE, Database, QUARANTINE_TABLE, init_changelog, read_changelog,
};
use cohort_transform::{select_new_students, uuid_set};

use crate::cli::{InitArgs, RunArgs, StatusArgs};
use crate::pipeline::{
    CommittedState, cleanse, commit, ingest, load_committed, prepare_lookups, validate_and_merge,
};
use crate::types::{RunResult, StatusReport};

pub fn run_reconcile(args: &RunArgs) -> Result<RunResult> {
    let source_dir = parent_dir(&args.source_db);
    let cleansed_db_path = args
        .cleansed_db
        .clone()
        .unwrap_or_else(|| source_dir.join("cleansed.db"));
    let changelog_path = args
        .changelog
        .clone()
        .unwrap_or_else(|| source_dir.join("changelog.md"));
    let snapshot_path = args
        .snapshot
        .clone()
        .unwrap_or_else(|| source_dir.join("cleansed.csv"));
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());

    let run_span = info_span!(
        "run",
        source_db = %args.source_db.display(),
        %as_of,
        dry_run = args.dry_run
    );
    let _run_guard = run_span.enter();

    if !args.source_db.exists() {
        bail!("source database {} not found", args.source_db.display());
    }
    let changelog = read_changelog(&changelog_path)?;
    let version_before = changelog.version();

    // =========================================================================
    // Stage 1: Ingest - Read the raw source tables and the committed state
    // =========================================================================
    let source = Database::open(&args.source_db)?;
    let ingest_span = info_span!("ingest");
    let ingest_start = Instant::now();
    let tables = ingest_span.in_scope(|| ingest(&source))?;
    info!(
        students = tables.students.height(),
        courses = tables.courses.height(),
        jobs = tables.jobs.height(),
        duration_ms = ingest_start.elapsed().as_millis(),
        "ingest complete"
    );

    // The store file is created lazily on first write, so no-op and dry
    // runs never leave an empty database behind.
    let mut cleansed_db = if cleansed_db_path.exists() {
        Some(Database::open(&cleansed_db_path)?)
    } else {
        None
    };
    let CommittedState {
        cleansed,
        quarantine_uuids,
    } = load_committed(cleansed_db.as_ref())?;

    // =========================================================================
    // Stage 2: Delta - Select records not yet committed
    // =========================================================================
    let delta = select_new_students(&tables.students, cleansed.as_ref())?;
    info!(
        raw = tables.students.height(),
        delta = delta.height(),
        "delta selected"
    );
    if delta.height() == 0 {
        info!("no new records, nothing to commit");
        return Ok(RunResult {
            source_db: args.source_db.clone(),
            cleansed_db: cleansed_db_path,
            snapshot: None,
            version_before,
            version_after: version_before,
            raw_students: tables.students.height(),
            delta_rows: 0,
            records_committed: 0,
            records_quarantined: 0,
            total_cleansed: table_rows(cleansed_db.as_ref(), CLEANSED_TABLE)?,
            total_quarantined: table_rows(cleansed_db.as_ref(), QUARANTINE_TABLE)?,
            dry_run: args.dry_run,
        });
    }

    // =========================================================================
    // Stage 3: Cleanse - Normalize and split off quarantine rows
    // =========================================================================
    let cleanse_span = info_span!("cleanse");
    let cleanse_start = Instant::now();
    let split = cleanse_span.in_scope(|| cleanse(&delta, as_of))?;
    info!(
        admissible = split.admissible.height(),
        quarantined = split.quarantined.height(),
        duration_ms = cleanse_start.elapsed().as_millis(),
        "cleanse complete"
    );

    // Quarantine rows are persisted before the admissible branch, keyed by
    // uuid, so a re-run cannot double-report them.
    let records_quarantined = if args.dry_run {
        uuid_set(&split.quarantined)?
            .difference(&quarantine_uuids)
            .count()
    } else if split.quarantined.height() == 0 {
        0
    } else {
        let db = open_store(&mut cleansed_db, &cleansed_db_path)?;
        db.append_rows(QUARANTINE_TABLE, &split.quarantined, Some(UUID))?
    };

    if split.admissible.height() == 0 {
        info!(records_quarantined, "no admissible records, commit skipped");
        return Ok(RunResult {
            source_db: args.source_db.clone(),
            cleansed_db: cleansed_db_path,
            snapshot: None,
            version_before,
            version_after: version_before,
            raw_students: tables.students.height(),
            delta_rows: delta.height(),
            records_committed: 0,
            records_quarantined,
            total_cleansed: table_rows(cleansed_db.as_ref(), CLEANSED_TABLE)?,
            total_quarantined: table_rows(cleansed_db.as_ref(), QUARANTINE_TABLE)?,
            dry_run: args.dry_run,
        });
    }

    // =========================================================================
    // Stage 4: Validate - Referential checks, merge, schema and null checks
    // =========================================================================
    let lookups = prepare_lookups(&tables)?;
    let validate_span = info_span!("validate");
    let validate_start = Instant::now();
    let merged =
        validate_span.in_scope(|| validate_and_merge(&split.admissible, &lookups, cleansed.as_ref()))?;
    info!(
        rows = merged.height(),
        duration_ms = validate_start.elapsed().as_millis(),
        "validation complete"
    );

    if args.dry_run {
        info!(rows = merged.height(), "dry run, commit skipped");
        return Ok(RunResult {
            source_db: args.source_db.clone(),
            cleansed_db: cleansed_db_path,
            snapshot: None,
            version_before,
            version_after: version_before.bump_patch(),
            raw_students: tables.students.height(),
            delta_rows: delta.height(),
            records_committed: merged.height(),
            records_quarantined,
            total_cleansed: table_rows(cleansed_db.as_ref(), CLEANSED_TABLE)? + merged.height(),
            total_quarantined: table_rows(cleansed_db.as_ref(), QUARANTINE_TABLE)?
                + records_quarantined,
            dry_run: true,
        });
    }

    // =========================================================================
    // Stage 5: Commit - Append, snapshot, changelog
    // =========================================================================
    let db = open_store(&mut cleansed_db, &cleansed_db_path)?;
    let commit_span = info_span!("commit");
    let commit_start = Instant::now();
    let outcome = commit_span.in_scope(|| {
        commit(db, &changelog, &merged, records_quarantined, &snapshot_path)
    })?;
    info!(
        version = %outcome.version,
        duration_ms = commit_start.elapsed().as_millis(),
        "run complete"
    );

    Ok(RunResult {
        source_db: args.source_db.clone(),
        cleansed_db: cleansed_db_path,
        snapshot: Some(snapshot_path),
        version_before,
        version_after: outcome.version,
        raw_students: tables.students.height(),
        delta_rows: delta.height(),
        records_committed: outcome.records_committed,
        records_quarantined,
        total_cleansed: outcome.total_cleansed,
        total_quarantined: table_rows(cleansed_db.as_ref(), QUARANTINE_TABLE)?,
        dry_run: false,
    })
}

pub fn run_init(args: &InitArgs) -> Result<Version> {
    let version = init_changelog(&args.changelog)?;
    info!(
        path = %args.changelog.display(),
        %version,
        "changelog seeded"
    );
    Ok(version)
}

pub fn run_status(args: &StatusArgs) -> Result<StatusReport> {
    let changelog_path = args
        .changelog
        .clone()
        .unwrap_or_else(|| parent_dir(&args.cleansed_db).join("changelog.md"));
    let changelog = read_changelog(&changelog_path)?;
    let db = if args.cleansed_db.exists() {
        Some(Database::open(&args.cleansed_db)?)
    } else {
        None
    };
    Ok(StatusReport {
        version: changelog.version(),
        cleansed_rows: table_rows(db.as_ref(), CLEANSED_TABLE)?,
        quarantine_rows: table_rows(db.as_ref(), QUARANTINE_TABLE)?,
    })
}

fn open_store<'a>(store: &'a mut Option<Database>, path: &Path) -> Result<&'a mut Database> {
    if store.is_none() {
        *store = Some(Database::open(path)?);
    }
    let Some(db) = store.as_mut() else {
        bail!("cleansed store {} unavailable", path.display());
    };
    Ok(db)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if parent != Path::new("") => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn table_rows(db: Option<&Database>, table: &str) -> Result<usize> {
    match db {
        Some(db) if db.table_exists(table)? => db.row_count(table),
        _ => Ok(0),
    }
}
