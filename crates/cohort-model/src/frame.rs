//! Row-wise DataFrame helpers.
//!
//! The pipeline manipulates frames column-by-column with explicit value
//! extraction rather than lazy expressions, so cell-level rules (null
//! routing, defaulting, joins) stay readable and auditable.

use anyhow::Result;
use polars::prelude::{AnyValue, BooleanChunked, DataFrame, NamedFrom, NewChunkedArray, Series};

pub fn any_to_string(value: AnyValue) -> String {
    match value {
        AnyValue::String(value) => value.to_string(),
        AnyValue::StringOwned(value) => value.to_string(),
        AnyValue::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Cell rendering for flat-file output: integral floats print without a
/// fractional part, nulls print empty.
pub fn any_to_string_for_output(value: AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(value) => value.to_string(),
        AnyValue::StringOwned(value) => value.to_string(),
        AnyValue::Float64(value) => format_numeric(value),
        AnyValue::Float32(value) => format_numeric(f64::from(value)),
        AnyValue::Int64(value) => value.to_string(),
        AnyValue::Int32(value) => value.to_string(),
        AnyValue::Boolean(value) => {
            if value {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        value => value.to_string(),
    }
}

pub fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub fn any_to_f64(value: AnyValue) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Float32(value) => Some(f64::from(value)),
        AnyValue::Float64(value) => Some(value),
        AnyValue::Int8(value) => Some(f64::from(value)),
        AnyValue::Int16(value) => Some(f64::from(value)),
        AnyValue::Int32(value) => Some(f64::from(value)),
        AnyValue::Int64(value) => Some(value as f64),
        AnyValue::UInt8(value) => Some(f64::from(value)),
        AnyValue::UInt16(value) => Some(f64::from(value)),
        AnyValue::UInt32(value) => Some(f64::from(value)),
        AnyValue::UInt64(value) => Some(value as f64),
        AnyValue::String(value) => parse_f64(value),
        AnyValue::StringOwned(value) => parse_f64(&value),
        _ => None,
    }
}

pub fn any_to_i64(value: AnyValue) -> Option<i64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(value) => Some(i64::from(value)),
        AnyValue::Int16(value) => Some(i64::from(value)),
        AnyValue::Int32(value) => Some(i64::from(value)),
        AnyValue::Int64(value) => Some(value),
        AnyValue::UInt8(value) => Some(i64::from(value)),
        AnyValue::UInt16(value) => Some(i64::from(value)),
        AnyValue::UInt32(value) => Some(i64::from(value)),
        AnyValue::UInt64(value) => Some(value as i64),
        AnyValue::Float32(value) => Some(value as i64),
        AnyValue::Float64(value) => Some(value as i64),
        AnyValue::String(value) => parse_i64(value),
        AnyValue::StringOwned(value) => parse_i64(&value),
        _ => None,
    }
}

pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Extract a column as strings, null cells becoming empty strings.
pub fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_string(series.get(idx).unwrap_or(AnyValue::Null)));
    }
    Ok(values)
}

/// Extract a column as strings, preserving nulls.
pub fn opt_string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        values.push(match value {
            AnyValue::Null => None,
            other => Some(any_to_string(other)),
        });
    }
    Ok(values)
}

pub fn numeric_column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_f64(series.get(idx).unwrap_or(AnyValue::Null)));
    }
    Ok(values)
}

pub fn numeric_column_i64(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_i64(series.get(idx).unwrap_or(AnyValue::Null)));
    }
    Ok(values)
}

pub fn set_string_column(df: &mut DataFrame, name: &str, values: Vec<String>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn set_opt_string_column(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<String>>,
) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn set_f64_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn set_i64_column(df: &mut DataFrame, name: &str, values: Vec<Option<i64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// Keep only rows flagged `true`.
pub fn filter_rows(df: &mut DataFrame, keep: &[bool]) -> Result<()> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    *df = df.filter(&mask)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use polars::prelude::IntoColumn;

    use super::*;

    fn sample_df() -> DataFrame {
        let uuid = Series::new("uuid".into(), vec!["a", "b", "c"]).into_column();
        let score = Series::new("score".into(), vec![Some(1.5), None, Some(3.0)]).into_column();
        DataFrame::new(vec![uuid, score]).expect("build frame")
    }

    #[test]
    fn numeric_extraction_preserves_nulls() {
        let df = sample_df();
        let values = numeric_column_f64(&df, "score").expect("extract");
        assert_eq!(values, vec![Some(1.5), None, Some(3.0)]);
    }

    #[test]
    fn string_coercion_parses_numbers() {
        assert_eq!(parse_f64(" 4.5 "), Some(4.5));
        assert_eq!(parse_f64(""), None);
        assert_eq!(any_to_f64(AnyValue::String("7")), Some(7.0));
        assert_eq!(any_to_f64(AnyValue::Null), None);
    }

    #[test]
    fn filter_rows_keeps_flagged() {
        let mut df = sample_df();
        filter_rows(&mut df, &[true, false, true]).expect("filter");
        assert_eq!(df.height(), 2);
        let uuids = string_column(&df, "uuid").expect("uuids");
        assert_eq!(uuids, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn output_formatting_is_flat() {
        assert_eq!(any_to_string_for_output(AnyValue::Float64(4.0)), "4");
        assert_eq!(any_to_string_for_output(AnyValue::Float64(4.5)), "4.5");
        assert_eq!(any_to_string_for_output(AnyValue::Null), "");
    }
}
