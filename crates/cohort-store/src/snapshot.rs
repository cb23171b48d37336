//! Flat snapshot export.
//!
//! After each run that commits new rows, the full cleansed table is written
//! to a CSV file (full overwrite) for consumers that cannot query the store.

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::{AnyValue, DataFrame};
use tracing::debug;

use cohort_model::frame::any_to_string_for_output;

pub fn write_snapshot(path: &Path, df: &DataFrame) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create snapshot {}", path.display()))?;

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    writer
        .write_record(&names)
        .context("write snapshot header")?;

    for row_idx in 0..df.height() {
        let mut record = Vec::with_capacity(names.len());
        for name in &names {
            let value = df.column(name)?.get(row_idx).unwrap_or(AnyValue::Null);
            record.push(any_to_string_for_output(value));
        }
        writer.write_record(&record).context("write snapshot row")?;
    }
    writer.flush().context("flush snapshot")?;
    debug!(path = %path.display(), rows = df.height(), "snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    use super::*;

    #[test]
    fn snapshot_is_full_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cleansed.csv");

        let df = DataFrame::new(vec![
            Series::new("uuid".into(), vec!["a", "b"]).into_column(),
            Series::new("hours".into(), vec![Some(2.0), Some(1.5)]).into_column(),
        ])
        .expect("frame");
        write_snapshot(&path, &df).expect("write");

        let smaller = df.head(Some(1));
        write_snapshot(&path, &smaller).expect("rewrite");

        let contents = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["uuid,hours", "a,2"]);
    }
}
