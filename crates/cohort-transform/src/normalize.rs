//! Record normalization for the three raw source tables.
//!
//! All normalizers are pure: they take a raw frame (cells may arrive as
//! TEXT) and return the canonical typed shape. The student normalizer also
//! takes the reference date for age derivation as an explicit parameter, so
//! runs are deterministic and tests can pin it.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use polars::prelude::{AnyValue, DataFrame, IntoColumn, NamedFrom, Series};
use tracing::debug;

use cohort_model::columns::{
    AGE, AGE_GROUP, AVG_SALARY, CAREER_PATH_ID, CAREER_PATH_NAME, CITY, CONTACT_INFO,
    CURRENT_CAREER_PATH_ID, DOB, EMAIL, HOURS_TO_COMPLETE, JOB_CATEGORY, JOB_ID, MAILING_ADDRESS,
    NAME, NUM_COURSE_TAKEN, PHONE, SENTINEL_CAREER_PATH_ID, SENTINEL_CAREER_PATH_NAME, SEX, STATE,
    STREET, TIME_SPENT_HRS, UUID, ZIP_CODE,
};
use cohort_model::frame::{
    any_to_string, filter_rows, numeric_column_f64, numeric_column_i64, opt_string_column,
    string_column,
};

const DOB_FORMAT: &str = "%Y-%m-%d";
const ADDRESS_PARTS: usize = 4;

/// Normalize raw student rows into the cleansed column shape.
///
/// Output rows may still carry nulls in the four nullable numeric columns;
/// the quarantine split decides their fate. A malformed `contact_info` blob
/// or an unparsable `dob` aborts the run.
pub fn normalize_students(raw: &DataFrame, as_of: NaiveDate) -> Result<DataFrame> {
    let uuids = string_column(raw, UUID)?;
    let names = opt_string_column(raw, NAME)?;
    let dobs = string_column(raw, DOB)?;
    let sexes = opt_string_column(raw, SEX)?;

    // Numeric coercion never raises on nulls; unparsable text also maps to
    // null and is handled by the quarantine split or the 0-default.
    let job_ids = numeric_column_f64(raw, JOB_ID)?;
    let courses_taken = numeric_column_f64(raw, NUM_COURSE_TAKEN)?;
    let career_paths = numeric_column_f64(raw, CURRENT_CAREER_PATH_ID)?;
    let hours = numeric_column_f64(raw, TIME_SPENT_HRS)?;

    let mut ages = Vec::with_capacity(raw.height());
    let mut age_groups = Vec::with_capacity(raw.height());
    for (uuid, dob) in uuids.iter().zip(&dobs) {
        let dob = NaiveDate::parse_from_str(dob.trim(), DOB_FORMAT)
            .with_context(|| format!("parse dob '{dob}' for student {uuid}"))?;
        let years = as_of.signed_duration_since(dob).num_days() as f64 / 365.25;
        let age = years.round();
        ages.push(Some(age));
        age_groups.push(Some(((age / 10.0).floor() as i64) * 10));
    }

    let contacts = opt_string_column(raw, CONTACT_INFO)?;
    let mut emails = Vec::with_capacity(raw.height());
    let mut phones = Vec::with_capacity(raw.height());
    for (uuid, blob) in uuids.iter().zip(&contacts) {
        let blob = blob
            .as_deref()
            .ok_or_else(|| anyhow!("missing contact_info for student {uuid}"))?;
        let parsed: serde_json::Value = serde_json::from_str(blob)
            .with_context(|| format!("parse contact_info for student {uuid}"))?;
        let fields = parsed
            .as_object()
            .ok_or_else(|| anyhow!("contact_info for student {uuid} is not an object"))?;
        emails.push(json_field(fields.get(EMAIL)));
        phones.push(json_field(fields.get(PHONE)));
    }

    let addresses = opt_string_column(raw, MAILING_ADDRESS)?;
    let mut address_parts: [Vec<Option<String>>; ADDRESS_PARTS] =
        std::array::from_fn(|_| Vec::with_capacity(raw.height()));
    for address in &addresses {
        let parts = split_address(address.as_deref());
        for (slot, part) in address_parts.iter_mut().zip(parts) {
            slot.push(part);
        }
    }
    let [streets, cities, states, zip_codes] = address_parts;

    let df = DataFrame::new(vec![
        Series::new(UUID.into(), uuids).into_column(),
        Series::new(NAME.into(), names).into_column(),
        Series::new(DOB.into(), dobs).into_column(),
        Series::new(SEX.into(), sexes).into_column(),
        Series::new(JOB_ID.into(), job_ids).into_column(),
        Series::new(NUM_COURSE_TAKEN.into(), courses_taken).into_column(),
        Series::new(CURRENT_CAREER_PATH_ID.into(), career_paths).into_column(),
        Series::new(TIME_SPENT_HRS.into(), hours).into_column(),
        Series::new(AGE.into(), ages).into_column(),
        Series::new(AGE_GROUP.into(), age_groups).into_column(),
        Series::new(EMAIL.into(), emails).into_column(),
        Series::new(PHONE.into(), phones).into_column(),
        Series::new(STREET.into(), streets).into_column(),
        Series::new(CITY.into(), cities).into_column(),
        Series::new(STATE.into(), states).into_column(),
        Series::new(ZIP_CODE.into(), zip_codes).into_column(),
    ])
    .context("assemble normalized student frame")?;
    debug!(rows = df.height(), "students normalized");
    Ok(df)
}

/// Normalize the course lookup table and guarantee the sentinel
/// "no career path" row exists exactly once (check-then-insert).
pub fn normalize_courses(raw: &DataFrame) -> Result<DataFrame> {
    let raw_ids = numeric_column_i64(raw, CAREER_PATH_ID)?;
    let mut ids = Vec::with_capacity(raw_ids.len() + 1);
    for (row, id) in raw_ids.into_iter().enumerate() {
        ids.push(Some(id.ok_or_else(|| {
            anyhow!("course row {row} has no career_path_id")
        })?));
    }
    let mut names = opt_string_column(raw, CAREER_PATH_NAME)?;
    let mut hours = numeric_column_f64(raw, HOURS_TO_COMPLETE)?;

    if !ids.contains(&Some(SENTINEL_CAREER_PATH_ID)) {
        ids.push(Some(SENTINEL_CAREER_PATH_ID));
        names.push(Some(SENTINEL_CAREER_PATH_NAME.to_string()));
        hours.push(Some(0.0));
    }

    let df = DataFrame::new(vec![
        Series::new(CAREER_PATH_ID.into(), ids).into_column(),
        Series::new(CAREER_PATH_NAME.into(), names).into_column(),
        Series::new(HOURS_TO_COMPLETE.into(), hours).into_column(),
    ])
    .context("assemble course frame")?;
    Ok(df)
}

/// Normalize the student-job lookup table, dropping exact-duplicate rows.
///
/// Duplicates are whole-row duplicates, not `job_id` duplicates: two rows
/// sharing a `job_id` but differing elsewhere both survive here and are
/// rejected later by the merge engine's fan-out guard.
pub fn normalize_student_jobs(raw: &DataFrame) -> Result<DataFrame> {
    let ids = numeric_column_i64(raw, JOB_ID)?;
    let categories = opt_string_column(raw, JOB_CATEGORY)?;
    let salaries = numeric_column_f64(raw, AVG_SALARY)?;

    let mut df = DataFrame::new(vec![
        Series::new(JOB_ID.into(), ids).into_column(),
        Series::new(JOB_CATEGORY.into(), categories).into_column(),
        Series::new(AVG_SALARY.into(), salaries).into_column(),
    ])
    .context("assemble student-job frame")?;
    drop_duplicate_rows(&mut df)?;
    Ok(df)
}

/// Drop rows whose every cell matches an earlier row.
fn drop_duplicate_rows(df: &mut DataFrame) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        columns.push(df.column(name)?.clone());
    }

    let mut seen = std::collections::HashSet::new();
    let mut keep = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut key = String::new();
        for column in &columns {
            key.push_str(&any_to_string(column.get(idx).unwrap_or(AnyValue::Null)));
            key.push('|');
        }
        keep.push(seen.insert(key));
    }
    if keep.iter().any(|kept| !kept) {
        let dropped = keep.iter().filter(|kept| !**kept).count();
        debug!(dropped, "exact-duplicate rows removed");
        filter_rows(df, &keep)?;
    }
    Ok(())
}

fn json_field(value: Option<&serde_json::Value>) -> Option<String> {
    match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Split a mailing address on commas into street, city, state, zip.
///
/// Fewer than four segments leave the trailing fields null (surfaced later
/// by the post-join null check); segments beyond four are ignored.
fn split_address(address: Option<&str>) -> [Option<String>; ADDRESS_PARTS] {
    let mut parts: [Option<String>; ADDRESS_PARTS] = Default::default();
    let Some(address) = address else {
        return parts;
    };
    for (slot, segment) in parts.iter_mut().zip(address.split(',')) {
        let trimmed = segment.trim();
        if !trimmed.is_empty() {
            *slot = Some(trimmed.to_string());
        }
    }
    parts
}
