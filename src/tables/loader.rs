//! CSV-based table loaders
//!
//! Range tables expect columns `min`, `max`, `value`. Exact-match tables
//! use configurable key and value columns so factor sheets can be loaded
//! as-is (e.g. `brand,factor`).

use std::error::Error;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::{ExactMatchTable, KeyKind, RangeTable};
use crate::value::Value;

/// Load a range table from CSV rows `min,max,value`.
pub fn load_range_table(
    path: &Path,
    default: Option<Value>,
) -> Result<RangeTable, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let min_idx = column_index(&headers, "min", path)?;
    let max_idx = column_index(&headers, "max", path)?;
    let value_idx = column_index(&headers, "value", path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let lo = Decimal::from_str(record[min_idx].trim())?;
        let hi = Decimal::from_str(record[max_idx].trim())?;
        let value = Decimal::from_str(record[value_idx].trim())?;
        rows.push((lo, hi, Value::Decimal(value)));
    }

    Ok(RangeTable::new(rows, default))
}

/// Load an exact-match table from CSV, taking keys and values from the
/// named columns.
pub fn load_exact_table(
    path: &Path,
    key_column: &str,
    value_column: &str,
    key_kind: KeyKind,
    default: Option<Value>,
) -> Result<ExactMatchTable, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let key_idx = column_index(&headers, key_column, path)?;
    let value_idx = column_index(&headers, value_column, path)?;

    match key_kind {
        KeyKind::Text => {
            let mut rows = Vec::new();
            for result in reader.records() {
                let record = result?;
                let key = record[key_idx].trim().to_string();
                let value = Decimal::from_str(record[value_idx].trim())?;
                rows.push((key, Value::Decimal(value)));
            }
            Ok(ExactMatchTable::with_text_keys(rows, default))
        }
        KeyKind::Integer => {
            let mut rows = Vec::new();
            for result in reader.records() {
                let record = result?;
                let key: i64 = record[key_idx].trim().parse()?;
                let value = Decimal::from_str(record[value_idx].trim())?;
                rows.push((key, Value::Decimal(value)));
            }
            Ok(ExactMatchTable::with_integer_keys(rows, default))
        }
    }
}

fn column_index(
    headers: &csv::StringRecord,
    name: &str,
    path: &Path,
) -> Result<usize, Box<dyn Error>> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| format!("{}: missing column '{}'", path.display(), name).into())
}
