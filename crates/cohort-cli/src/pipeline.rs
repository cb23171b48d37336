//! Reconciliation pipeline with explicit stages.
//!
//! The pipeline follows these stages in order:
//! 1. **Ingest**: read the three raw source tables
//! 2. **Cleanse**: normalize the student delta, split off quarantine rows
//! 3. **Validate**: referential checks, merge, schema and null checks
//! 4. **Commit**: append cleansed rows, snapshot, prepend changelog entry
//!
//! Each stage takes the output of the previous stage and returns typed
//! results. The stages are side-effect free except `commit`.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::{error, info};

use cohort_model::columns::UUID;
use cohort_model::{ChangelogEntry, Version};
use cohort_store::{
    CLEANSED_TABLE, COURSES_TABLE, Changelog, Database, QUARANTINE_TABLE, STUDENTS_TABLE,
    STUDENT_JOBS_TABLE, write_snapshot,
};
use cohort_transform::{
    QuarantineSplit, merge_records, normalize_courses, normalize_student_jobs, normalize_students,
    split_quarantine, uuid_set,
};
use cohort_validate::{check_career_path_ids, check_job_ids, check_no_nulls, check_schema};

/// The three raw source tables, read in full.
#[derive(Debug)]
pub struct SourceTables {
    pub students: DataFrame,
    pub courses: DataFrame,
    pub jobs: DataFrame,
}

/// Read the raw source tables. All three must exist.
pub fn ingest(db: &Database) -> Result<SourceTables> {
    Ok(SourceTables {
        students: db.read_table(STUDENTS_TABLE).context("read students")?,
        courses: db.read_table(COURSES_TABLE).context("read courses")?,
        jobs: db
            .read_table(STUDENT_JOBS_TABLE)
            .context("read student jobs")?,
    })
}

/// State of the cleansed store at run start.
#[derive(Debug)]
pub struct CommittedState {
    /// The committed cleansed table, absent on the first run.
    pub cleansed: Option<DataFrame>,
    /// Identities already present in the quarantine table.
    pub quarantine_uuids: BTreeSet<String>,
}

pub fn load_committed(db: Option<&Database>) -> Result<CommittedState> {
    let Some(db) = db else {
        return Ok(CommittedState {
            cleansed: None,
            quarantine_uuids: BTreeSet::new(),
        });
    };
    let cleansed = db
        .read_table_if_exists(CLEANSED_TABLE)
        .context("read cleansed table")?;
    let quarantine_uuids = match db
        .read_table_if_exists(QUARANTINE_TABLE)
        .context("read quarantine table")?
    {
        Some(df) => uuid_set(&df)?,
        None => BTreeSet::new(),
    };
    Ok(CommittedState {
        cleansed,
        quarantine_uuids,
    })
}

/// Normalize the student delta and split off the quarantine rows.
pub fn cleanse(delta: &DataFrame, as_of: NaiveDate) -> Result<QuarantineSplit> {
    let normalized = normalize_students(delta, as_of)?;
    split_quarantine(&normalized)
}

/// Normalized lookup tables for the merge.
#[derive(Debug)]
pub struct Lookups {
    pub courses: DataFrame,
    pub jobs: DataFrame,
}

pub fn prepare_lookups(source: &SourceTables) -> Result<Lookups> {
    Ok(Lookups {
        courses: normalize_courses(&source.courses).context("normalize courses")?,
        jobs: normalize_student_jobs(&source.jobs).context("normalize student jobs")?,
    })
}

/// Run the referential checks, merge the admissible rows with the lookup
/// tables and verify the merged batch against the committed table.
pub fn validate_and_merge(
    admissible: &DataFrame,
    lookups: &Lookups,
    committed: Option<&DataFrame>,
) -> Result<DataFrame> {
    if let Err(check) = check_job_ids(admissible, &lookups.jobs) {
        error!(%check, "referential check failed");
        return Err(check.into());
    }
    if let Err(check) = check_career_path_ids(admissible, &lookups.courses) {
        error!(%check, "referential check failed");
        return Err(check.into());
    }
    info!("referential checks passed");

    let merged = merge_records(admissible, &lookups.courses, &lookups.jobs)?;

    if let Some(committed) = committed {
        if let Err(check) = check_schema(&merged, committed) {
            error!(%check, "schema drift against committed table");
            return Err(check.into());
        }
        info!("schema matches committed table");
    }
    if let Err(check) = check_no_nulls(&merged) {
        error!(%check, "null cells after merge");
        return Err(check.into());
    }
    info!("merged batch is null-free");
    Ok(merged)
}

/// Outcome of the commit stage.
#[derive(Debug)]
pub struct CommitOutcome {
    pub version: Version,
    pub records_committed: usize,
    pub total_cleansed: usize,
}

/// Append the merged batch, rewrite the snapshot and prepend a changelog
/// entry with a bumped patch version.
///
/// The cleansed append is keyed by `uuid`, so a retry after a partial
/// failure re-inserts only what is missing.
pub fn commit(
    db: &mut Database,
    changelog: &Changelog,
    merged: &DataFrame,
    records_quarantined: usize,
    snapshot: &Path,
) -> Result<CommitOutcome> {
    let records_committed = db
        .append_rows(CLEANSED_TABLE, merged, Some(UUID))
        .context("append cleansed rows")?;

    let cleansed = db
        .read_table(CLEANSED_TABLE)
        .context("re-read cleansed table")?;
    write_snapshot(snapshot, &cleansed)?;

    let version = changelog.version().bump_patch();
    changelog.prepend(&ChangelogEntry {
        version,
        records_committed,
        records_quarantined,
    })?;
    info!(
        %version,
        records_committed,
        records_quarantined,
        "commit complete"
    );
    Ok(CommitOutcome {
        version,
        records_committed,
        total_cleansed: cleansed.height(),
    })
}
