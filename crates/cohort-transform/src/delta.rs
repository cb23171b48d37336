//! Delta selection.
//!
//! A raw student row is "new" iff its `uuid` is absent from the committed
//! cleansed table. Presence in the quarantine table does not exclude a row:
//! an unresolved quarantined record is re-evaluated on every run (and kept
//! from piling up by the keyed quarantine write).

use std::collections::BTreeSet;

use anyhow::Result;
use polars::prelude::DataFrame;
use tracing::debug;

use cohort_model::columns::UUID;
use cohort_model::frame::{filter_rows, string_column};

/// The committed `uuid` values of a frame.
pub fn uuid_set(df: &DataFrame) -> Result<BTreeSet<String>> {
    Ok(string_column(df, UUID)?.into_iter().collect())
}

/// Select the raw student rows not yet reflected in the committed cleansed
/// table. On the first run (no committed table) the delta is the whole
/// snapshot.
pub fn select_new_students(raw: &DataFrame, committed: Option<&DataFrame>) -> Result<DataFrame> {
    let Some(committed) = committed else {
        debug!(rows = raw.height(), "no committed table, full snapshot selected");
        return Ok(raw.clone());
    };
    let known = uuid_set(committed)?;
    let keep: Vec<bool> = string_column(raw, UUID)?
        .iter()
        .map(|uuid| !known.contains(uuid))
        .collect();
    let mut delta = raw.clone();
    filter_rows(&mut delta, &keep)?;
    debug!(
        raw = raw.height(),
        delta = delta.height(),
        "delta selected"
    );
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    use super::*;

    fn students(uuids: &[&str]) -> DataFrame {
        DataFrame::new(vec![
            Series::new(
                UUID.into(),
                uuids.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
            )
            .into_column(),
        ])
        .expect("frame")
    }

    #[test]
    fn first_run_selects_everything() {
        let raw = students(&["a", "b"]);
        let delta = select_new_students(&raw, None).expect("delta");
        assert_eq!(delta.height(), 2);
    }

    #[test]
    fn committed_uuids_are_excluded() {
        let raw = students(&["a", "b", "c"]);
        let committed = students(&["a", "c"]);
        let delta = select_new_students(&raw, Some(&committed)).expect("delta");
        assert_eq!(string_column(&delta, UUID).unwrap(), vec!["b"]);
    }

    #[test]
    fn unchanged_input_yields_empty_delta() {
        let raw = students(&["a", "b"]);
        let delta = select_new_students(&raw, Some(&raw)).expect("delta");
        assert_eq!(delta.height(), 0);
    }
}
