use std::path::PathBuf;

use cohort_model::Version;

/// Outcome of one reconciliation run.
#[derive(Debug)]
pub struct RunResult {
    pub source_db: PathBuf,
    pub cleansed_db: PathBuf,
    /// Snapshot path, when one was written.
    pub snapshot: Option<PathBuf>,
    pub version_before: Version,
    /// Equal to `version_before` unless the run committed admissible rows.
    pub version_after: Version,
    pub raw_students: usize,
    pub delta_rows: usize,
    pub records_committed: usize,
    pub records_quarantined: usize,
    pub total_cleansed: usize,
    pub total_quarantined: usize,
    pub dry_run: bool,
}

/// Snapshot of the cleansed store for the `status` subcommand.
#[derive(Debug)]
pub struct StatusReport {
    pub version: Version,
    pub cleansed_rows: usize,
    pub quarantine_rows: usize,
}
