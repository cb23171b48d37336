//! Pre-join and post-join integrity checks.
//!
//! All checks are pure functions over frames and return a typed error on
//! the first violated invariant; the pipeline logs and aborts.

use std::collections::BTreeSet;

use polars::prelude::DataFrame;

use cohort_model::columns::{CAREER_PATH_ID, CURRENT_CAREER_PATH_ID, JOB_ID};
use cohort_model::frame::numeric_column_i64;

use crate::error::ValidationError;

/// Every non-null `job_id` in the admissible delta must resolve against the
/// deduplicated student-job table.
pub fn check_job_ids(students: &DataFrame, jobs: &DataFrame) -> Result<(), ValidationError> {
    let missing = missing_ids(students, JOB_ID, jobs, JOB_ID)?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingJobIds { missing })
    }
}

/// Every `current_career_path_id` must resolve against the
/// sentinel-augmented course table.
pub fn check_career_path_ids(
    students: &DataFrame,
    courses: &DataFrame,
) -> Result<(), ValidationError> {
    let missing = missing_ids(students, CURRENT_CAREER_PATH_ID, courses, CAREER_PATH_ID)?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingCareerPathIds { missing })
    }
}

/// Schema compatibility against the committed table: same column count,
/// same dtype for every committed column. Only called when a committed
/// table exists.
pub fn check_schema(batch: &DataFrame, committed: &DataFrame) -> Result<(), ValidationError> {
    let expected = committed.width();
    let actual = batch.width();
    if expected != actual {
        return Err(ValidationError::ColumnCountMismatch { expected, actual });
    }

    let mut mismatched = Vec::new();
    for name in committed.get_column_names() {
        let committed_dtype = committed
            .column(name)
            .map_err(|error| ValidationError::Column(error.to_string()))?
            .dtype()
            .clone();
        match batch.column(name) {
            Ok(column) if column.dtype() == &committed_dtype => {}
            _ => mismatched.push(name.to_string()),
        }
    }
    if mismatched.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaMismatch {
            count: mismatched.len(),
            columns: mismatched,
        })
    }
}

/// The merged batch must be entirely null-free. A null here means a left
/// join missed despite the referential checks passing, so it is an
/// internal-consistency failure rather than a user data error.
pub fn check_no_nulls(df: &DataFrame) -> Result<(), ValidationError> {
    let mut null_rows = vec![false; df.height()];
    for name in df.get_column_names() {
        let column = df
            .column(name)
            .map_err(|error| ValidationError::Column(error.to_string()))?;
        if column.null_count() == 0 {
            continue;
        }
        for (idx, flagged) in null_rows.iter_mut().enumerate() {
            if column.get(idx).is_ok_and(|value| value.is_null()) {
                *flagged = true;
            }
        }
    }
    let rows = null_rows.iter().filter(|flagged| **flagged).count();
    if rows == 0 {
        Ok(())
    } else {
        Err(ValidationError::NullCells { rows })
    }
}

/// Distinct non-null ids of `id_column` in `rows` that do not appear in
/// `lookup_column` of `lookup`, sorted ascending.
fn missing_ids(
    rows: &DataFrame,
    id_column: &str,
    lookup: &DataFrame,
    lookup_column: &str,
) -> Result<Vec<i64>, ValidationError> {
    let known: BTreeSet<i64> = numeric_column_i64(lookup, lookup_column)
        .map_err(|error| ValidationError::Column(error.to_string()))?
        .into_iter()
        .flatten()
        .collect();
    let referenced: BTreeSet<i64> = numeric_column_i64(rows, id_column)
        .map_err(|error| ValidationError::Column(error.to_string()))?
        .into_iter()
        .flatten()
        .collect();
    Ok(referenced.difference(&known).copied().collect())
}

#[cfg(test)]
mod tests {
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    use super::*;

    fn frame(name: &str, values: Vec<Option<i64>>) -> DataFrame {
        DataFrame::new(vec![Series::new(name.into(), values).into_column()]).expect("frame")
    }

    #[test]
    fn referential_check_reports_missing_ids_sorted() {
        let students = frame(JOB_ID, vec![Some(1), Some(9), Some(4), Some(9)]);
        let jobs = frame(JOB_ID, vec![Some(1), Some(2)]);
        let error = check_job_ids(&students, &jobs).unwrap_err();
        assert_eq!(
            error,
            ValidationError::MissingJobIds {
                missing: vec![4, 9]
            }
        );
    }

    #[test]
    fn referential_check_passes_on_subset() {
        let students = frame(CURRENT_CAREER_PATH_ID, vec![Some(0), Some(2)]);
        let courses = frame(CAREER_PATH_ID, vec![Some(0), Some(1), Some(2)]);
        assert!(check_career_path_ids(&students, &courses).is_ok());
    }

    #[test]
    fn column_count_mismatch_is_reported_first() {
        let committed = DataFrame::new(vec![
            Series::new("a".into(), vec![1i64]).into_column(),
            Series::new("b".into(), vec![1i64]).into_column(),
        ])
        .expect("frame");
        let batch = frame("a", vec![Some(1)]);
        assert_eq!(
            check_schema(&batch, &committed).unwrap_err(),
            ValidationError::ColumnCountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn dtype_drift_is_counted() {
        let committed = DataFrame::new(vec![
            Series::new("a".into(), vec![1i64]).into_column(),
            Series::new("b".into(), vec![1.0f64]).into_column(),
        ])
        .expect("frame");
        let batch = DataFrame::new(vec![
            Series::new("a".into(), vec!["1"]).into_column(),
            Series::new("b".into(), vec![1.0f64]).into_column(),
        ])
        .expect("frame");
        assert_eq!(
            check_schema(&batch, &committed).unwrap_err(),
            ValidationError::SchemaMismatch {
                count: 1,
                columns: vec!["a".to_string()]
            }
        );
    }

    #[test]
    fn matching_schema_passes() {
        let committed = DataFrame::new(vec![
            Series::new("a".into(), vec![1i64]).into_column(),
            Series::new("b".into(), vec![1.0f64]).into_column(),
        ])
        .expect("frame");
        assert!(check_schema(&committed, &committed).is_ok());
    }

    #[test]
    fn null_cells_counted_by_row() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), vec![Some(1i64), None, Some(3)]).into_column(),
            Series::new("b".into(), vec![None::<f64>, None, Some(1.0)]).into_column(),
        ])
        .expect("frame");
        assert_eq!(
            check_no_nulls(&df).unwrap_err(),
            ValidationError::NullCells { rows: 2 }
        );
    }

    #[test]
    fn null_free_frame_passes() {
        let df = frame("a", vec![Some(1), Some(2)]);
        assert!(check_no_nulls(&df).is_ok());
    }
}
