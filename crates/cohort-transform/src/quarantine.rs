//! Quarantine split.
//!
//! Rows missing `num_course_taken` or `job_id` have no safe default and are
//! routed to quarantine. The quarantine decision is taken before any
//! default-filling, so a row with both a non-recoverable and a recoverable
//! null is quarantined, never defaulted. Surviving rows get their
//! `current_career_path_id` and `time_spent_hrs` nulls filled with 0.

use anyhow::Result;
use polars::prelude::DataFrame;
use tracing::debug;

use cohort_model::columns::{DEFAULTABLE_COLUMNS, REQUIRED_COLUMNS};
use cohort_model::frame::{filter_rows, numeric_column_f64, set_f64_column};

#[derive(Debug)]
pub struct QuarantineSplit {
    /// Rows eligible for merging and commit; the required columns are
    /// non-null and the defaultable columns are filled.
    pub admissible: DataFrame,
    /// Rows excluded for missing a non-defaultable required field, kept in
    /// the normalized shape (nulls intact).
    pub quarantined: DataFrame,
}

pub fn split_quarantine(normalized: &DataFrame) -> Result<QuarantineSplit> {
    let mut admissible_mask = vec![true; normalized.height()];
    for column in REQUIRED_COLUMNS {
        let values = numeric_column_f64(normalized, column)?;
        for (keep, value) in admissible_mask.iter_mut().zip(&values) {
            *keep &= value.is_some();
        }
    }
    let quarantine_mask: Vec<bool> = admissible_mask.iter().map(|keep| !keep).collect();

    let mut admissible = normalized.clone();
    filter_rows(&mut admissible, &admissible_mask)?;
    let mut quarantined = normalized.clone();
    filter_rows(&mut quarantined, &quarantine_mask)?;

    for column in DEFAULTABLE_COLUMNS {
        let values = numeric_column_f64(&admissible, column)?
            .into_iter()
            .map(|value| Some(value.unwrap_or(0.0)))
            .collect();
        set_f64_column(&mut admissible, column, values)?;
    }

    debug!(
        admissible = admissible.height(),
        quarantined = quarantined.height(),
        "quarantine split complete"
    );
    Ok(QuarantineSplit {
        admissible,
        quarantined,
    })
}

#[cfg(test)]
mod tests {
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    use cohort_model::columns::{
        CURRENT_CAREER_PATH_ID, JOB_ID, NUM_COURSE_TAKEN, TIME_SPENT_HRS, UUID,
    };
    use cohort_model::frame::string_column;

    use super::*;

    fn normalized(rows: Vec<(&str, Option<f64>, Option<f64>, Option<f64>, Option<f64>)>) -> DataFrame {
        DataFrame::new(vec![
            Series::new(
                UUID.into(),
                rows.iter().map(|r| r.0.to_string()).collect::<Vec<_>>(),
            )
            .into_column(),
            Series::new(
                JOB_ID.into(),
                rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            )
            .into_column(),
            Series::new(
                NUM_COURSE_TAKEN.into(),
                rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            )
            .into_column(),
            Series::new(
                CURRENT_CAREER_PATH_ID.into(),
                rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            )
            .into_column(),
            Series::new(
                TIME_SPENT_HRS.into(),
                rows.iter().map(|r| r.4).collect::<Vec<_>>(),
            )
            .into_column(),
        ])
        .expect("normalized frame")
    }

    #[test]
    fn required_nulls_route_to_quarantine() {
        let split = split_quarantine(&normalized(vec![
            ("a", Some(1.0), Some(5.0), Some(2.0), Some(4.0)),
            ("b", None, Some(5.0), Some(2.0), Some(4.0)),
            ("c", Some(1.0), None, Some(2.0), Some(4.0)),
        ]))
        .expect("split");
        assert_eq!(string_column(&split.admissible, UUID).unwrap(), vec!["a"]);
        assert_eq!(
            string_column(&split.quarantined, UUID).unwrap(),
            vec!["b", "c"]
        );
    }

    #[test]
    fn recoverable_nulls_default_to_zero() {
        let split = split_quarantine(&normalized(vec![(
            "a",
            Some(1.0),
            Some(5.0),
            None,
            None,
        )]))
        .expect("split");
        assert_eq!(split.quarantined.height(), 0);
        assert_eq!(
            numeric_column_f64(&split.admissible, CURRENT_CAREER_PATH_ID).unwrap(),
            vec![Some(0.0)]
        );
        assert_eq!(
            numeric_column_f64(&split.admissible, TIME_SPENT_HRS).unwrap(),
            vec![Some(0.0)]
        );
    }

    #[test]
    fn quarantine_wins_over_defaulting() {
        // A row with a required null and a recoverable null must land in
        // quarantine with the recoverable null intact.
        let split = split_quarantine(&normalized(vec![(
            "a",
            None,
            Some(5.0),
            None,
            Some(4.0),
        )]))
        .expect("split");
        assert_eq!(split.admissible.height(), 0);
        assert_eq!(split.quarantined.height(), 1);
        assert_eq!(
            numeric_column_f64(&split.quarantined, CURRENT_CAREER_PATH_ID).unwrap(),
            vec![None]
        );
    }
}
