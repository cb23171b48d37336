//! Merge engine.
//!
//! Left-joins the admissible student delta with the course and job lookup
//! tables. Both joins are many-to-one: the lookup tables must be uniquely
//! keyed after normalization, and a duplicate key is a hard error rather
//! than a silent row fan-out, so N admissible rows always produce exactly N
//! merged rows. An unmatched key splices nulls, which the post-join null
//! check then reports as an internal-consistency failure.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use polars::prelude::DataFrame;
use tracing::debug;

use cohort_model::columns::{
    AVG_SALARY, CAREER_PATH_ID, CAREER_PATH_NAME, CURRENT_CAREER_PATH_ID, HOURS_TO_COMPLETE,
    JOB_CATEGORY, JOB_ID,
};
use cohort_model::frame::{
    numeric_column_f64, numeric_column_i64, opt_string_column, set_f64_column, set_i64_column,
    set_opt_string_column,
};

pub fn merge_records(
    students: &DataFrame,
    courses: &DataFrame,
    jobs: &DataFrame,
) -> Result<DataFrame> {
    let mut merged = students.clone();

    // Join keys become integers once the admissible set is known to be
    // null-free in these columns.
    let student_job_ids = numeric_column_i64(&merged, JOB_ID)?;
    let student_career_paths = numeric_column_i64(&merged, CURRENT_CAREER_PATH_ID)?;
    set_i64_column(&mut merged, JOB_ID, student_job_ids.clone())?;
    set_i64_column(&mut merged, CURRENT_CAREER_PATH_ID, student_career_paths.clone())?;

    let course_index = unique_key_index(courses, CAREER_PATH_ID).context("index courses")?;
    let job_index = unique_key_index(jobs, JOB_ID).context("index student jobs")?;

    let course_names = opt_string_column(courses, CAREER_PATH_NAME)?;
    let course_hours = numeric_column_f64(courses, HOURS_TO_COMPLETE)?;
    let job_categories = opt_string_column(jobs, JOB_CATEGORY)?;
    let job_salaries = numeric_column_f64(jobs, AVG_SALARY)?;

    let height = merged.height();
    let mut career_path_ids = Vec::with_capacity(height);
    let mut career_path_names = Vec::with_capacity(height);
    let mut hours_to_complete = Vec::with_capacity(height);
    let mut categories = Vec::with_capacity(height);
    let mut salaries = Vec::with_capacity(height);

    for (career_path, job_id) in student_career_paths.iter().zip(&student_job_ids) {
        match career_path.and_then(|key| course_index.get(&key)) {
            Some(&row) => {
                career_path_ids.push(*career_path);
                career_path_names.push(course_names[row].clone());
                hours_to_complete.push(course_hours[row]);
            }
            None => {
                career_path_ids.push(None);
                career_path_names.push(None);
                hours_to_complete.push(None);
            }
        }
        match job_id.and_then(|key| job_index.get(&key)) {
            Some(&row) => {
                categories.push(job_categories[row].clone());
                salaries.push(job_salaries[row]);
            }
            None => {
                categories.push(None);
                salaries.push(None);
            }
        }
    }

    set_i64_column(&mut merged, CAREER_PATH_ID, career_path_ids)?;
    set_opt_string_column(&mut merged, CAREER_PATH_NAME, career_path_names)?;
    set_f64_column(&mut merged, HOURS_TO_COMPLETE, hours_to_complete)?;
    set_opt_string_column(&mut merged, JOB_CATEGORY, categories)?;
    set_f64_column(&mut merged, AVG_SALARY, salaries)?;

    debug!(rows = merged.height(), "merge complete");
    Ok(merged)
}

/// Key -> row index for a lookup table. A duplicate key would fan out the
/// left join, so it is rejected here.
fn unique_key_index(df: &DataFrame, key: &str) -> Result<BTreeMap<i64, usize>> {
    let mut index = BTreeMap::new();
    for (row, id) in numeric_column_i64(df, key)?.into_iter().enumerate() {
        let Some(id) = id else {
            continue;
        };
        if index.insert(id, row).is_some() {
            bail!("duplicate {key} {id} in lookup table");
        }
    }
    Ok(index)
}
