use thiserror::Error;

/// Fatal validation failures. None of these are recoverable: the run aborts
/// and an operator has to fix the source data or the schema before retrying.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing job_id(s) {missing:?} in the student_jobs table")]
    MissingJobIds { missing: Vec<i64> },

    #[error("missing career_path_id(s) {missing:?} in the courses table")]
    MissingCareerPathIds { missing: Vec<i64> },

    #[error("column count changed: new batch has {actual} columns, committed table has {expected}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("{count} column(s) changed type against the committed table: {columns:?}")]
    SchemaMismatch { count: usize, columns: Vec<String> },

    #[error("{rows} row(s) contain null cells after the join")]
    NullCells { rows: usize },

    #[error("column error: {0}")]
    Column(String),
}
