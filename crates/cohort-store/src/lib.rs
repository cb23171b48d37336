pub mod changelog;
pub mod snapshot;
pub mod sqlite;

pub use changelog::{Changelog, init_changelog, read_changelog};
pub use snapshot::write_snapshot;
pub use sqlite::Database;

/// Source table names (read-only input store).
pub const STUDENTS_TABLE: &str = "students";
pub const COURSES_TABLE: &str = "courses";
pub const STUDENT_JOBS_TABLE: &str = "student_jobs";

/// Cleansed store table names (append-only output store).
pub const CLEANSED_TABLE: &str = "cleansed";
pub const QUARANTINE_TABLE: &str = "quarantine";
