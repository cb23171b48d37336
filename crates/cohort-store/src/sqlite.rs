//! SQLite-backed table store.
//!
//! Tables are moved in and out of SQLite as polars DataFrames. Reads are
//! driven by the declared column types (`PRAGMA table_info`), so a committed
//! table round-trips with the same dtypes it was written with: TEXT maps to
//! String, REAL to Float64 and INTEGER to Int64. Appends create the table on
//! first use and, when a key column is given, use `INSERT OR IGNORE` so
//! re-running a commit is idempotent.

use std::path::Path;

use anyhow::{Context, Result, bail};
use polars::prelude::{AnyValue, DataFrame, DataType, IntoColumn, NamedFrom, Series};
use rusqlite::{Connection, params_from_iter, types::Value};
use tracing::debug;

use cohort_model::frame::{any_to_f64, any_to_i64, any_to_string};

/// How a column travels through SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Real,
    Integer,
}

impl ColumnKind {
    fn from_decl_type(decl: &str) -> Self {
        let upper = decl.to_uppercase();
        if upper.contains("INT") {
            ColumnKind::Integer
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnKind::Real
        } else {
            ColumnKind::Text
        }
    }

    fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Float32 | DataType::Float64 => ColumnKind::Real,
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Boolean => ColumnKind::Integer,
            _ => ColumnKind::Text,
        }
    }

    fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Real => "REAL",
            ColumnKind::Integer => "INTEGER",
        }
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        Ok(Self { conn })
    }

    #[doc(hidden)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        Ok(Self { conn })
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .with_context(|| format!("check table '{table}'"))?;
        Ok(count > 0)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("count rows in '{table}'"))?;
        Ok(count as usize)
    }

    /// Read a full table into a DataFrame, or `None` if the table does not
    /// exist (first run against a fresh cleansed store).
    pub fn read_table_if_exists(&self, table: &str) -> Result<Option<DataFrame>> {
        if !self.table_exists(table)? {
            return Ok(None);
        }
        self.read_table(table).map(Some)
    }

    /// Read a full table into a DataFrame with dtypes taken from the
    /// declared column types.
    pub fn read_table(&self, table: &str) -> Result<DataFrame> {
        let columns = self.table_columns(table)?;
        if columns.is_empty() {
            bail!("table '{table}' does not exist");
        }

        let select_list = columns
            .iter()
            .map(|(name, _)| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {select_list} FROM \"{table}\""))
            .with_context(|| format!("prepare read of '{table}'"))?;

        let mut cells: Vec<Vec<Value>> = vec![Vec::new(); columns.len()];
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (idx, column) in cells.iter_mut().enumerate() {
                column.push(row.get::<_, Value>(idx)?);
            }
        }

        let mut frame_columns = Vec::with_capacity(columns.len());
        for ((name, kind), values) in columns.iter().zip(cells) {
            frame_columns.push(build_series(name, *kind, &values).into_column());
        }
        let df = DataFrame::new(frame_columns)
            .with_context(|| format!("assemble frame for '{table}'"))?;
        debug!(table, rows = df.height(), "table read");
        Ok(df)
    }

    /// Append the frame's rows, creating the table on first use.
    ///
    /// With a key column the insert is `INSERT OR IGNORE` against a primary
    /// key, so rows already present are skipped. Returns the number of rows
    /// actually inserted. All rows of one call land in one transaction.
    pub fn append_rows(&mut self, table: &str, df: &DataFrame, key: Option<&str>) -> Result<usize> {
        if df.height() == 0 {
            return Ok(0);
        }

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut kinds = Vec::with_capacity(names.len());
        for name in &names {
            kinds.push(ColumnKind::from_dtype(df.column(name)?.dtype()));
        }

        let mut ddl_columns = Vec::with_capacity(names.len());
        for (name, kind) in names.iter().zip(&kinds) {
            let mut decl = format!("\"{name}\" {}", kind.sql_type());
            if key == Some(name.as_str()) {
                decl.push_str(" PRIMARY KEY");
            }
            ddl_columns.push(decl);
        }
        self.conn
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS \"{table}\" ({})",
                    ddl_columns.join(", ")
                ),
                [],
            )
            .with_context(|| format!("create table '{table}'"))?;

        let column_list = names
            .iter()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=names.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        let verb = if key.is_some() {
            "INSERT OR IGNORE"
        } else {
            "INSERT"
        };
        let sql = format!("{verb} INTO \"{table}\" ({column_list}) VALUES ({placeholders})");

        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row_idx in 0..df.height() {
                let mut params = Vec::with_capacity(names.len());
                for (name, kind) in names.iter().zip(&kinds) {
                    let value = df.column(name)?.get(row_idx).unwrap_or(AnyValue::Null);
                    params.push(to_sql_value(value, *kind));
                }
                inserted += stmt
                    .execute(params_from_iter(params))
                    .with_context(|| format!("insert into '{table}'"))?;
            }
        }
        tx.commit().with_context(|| format!("commit '{table}'"))?;
        debug!(table, rows = df.height(), inserted, "rows appended");
        Ok(inserted)
    }

    /// Column names and kinds in table order.
    fn table_columns(&self, table: &str) -> Result<Vec<(String, ColumnKind)>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info(\"{table}\")"))
            .with_context(|| format!("read schema of '{table}'"))?;
        let mut rows = stmt.query([])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(1)?;
            let decl: Option<String> = row.get(2)?;
            let kind = decl
                .as_deref()
                .map_or(ColumnKind::Text, ColumnKind::from_decl_type);
            columns.push((name, kind));
        }
        Ok(columns)
    }
}

fn build_series(name: &str, kind: ColumnKind, values: &[Value]) -> Series {
    match kind {
        ColumnKind::Text => {
            let cells: Vec<Option<String>> = values.iter().map(value_to_string).collect();
            Series::new(name.into(), cells)
        }
        ColumnKind::Real => {
            let cells: Vec<Option<f64>> = values.iter().map(value_to_f64).collect();
            Series::new(name.into(), cells)
        }
        ColumnKind::Integer => {
            let cells: Vec<Option<i64>> = values.iter().map(value_to_i64).collect();
            Series::new(name.into(), cells)
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(v) => Some(v.to_string()),
        Value::Real(v) => Some(v.to_string()),
        Value::Text(v) => Some(v.clone()),
        Value::Blob(_) => None,
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(v) => Some(*v as f64),
        Value::Real(v) => Some(*v),
        Value::Text(v) => v.trim().parse().ok(),
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(v) => Some(*v),
        Value::Real(v) => Some(*v as i64),
        Value::Text(v) => v.trim().parse().ok(),
    }
}

fn to_sql_value(value: AnyValue, kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Real => any_to_f64(value).map_or(Value::Null, Value::Real),
        ColumnKind::Integer => any_to_i64(value).map_or(Value::Null, Value::Integer),
        ColumnKind::Text => match value {
            AnyValue::Null => Value::Null,
            other => Value::Text(any_to_string(other)),
        },
    }
}
