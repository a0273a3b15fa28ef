//! Timestamp validation for timestamp-like columns.
//!
//! Invalid values are reported as critical issues and never repaired.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::config::TimestampConfig;
use crate::model::{Dataset, Value};

/// Epoch magnitudes at or above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Parse a cell as a timestamp. `None` means invalid or missing.
pub fn parse_timestamp(value: &Value, config: &TimestampConfig) -> Option<NaiveDateTime> {
    match value {
        Value::Null => None,
        Value::Text(s) => parse_text(s.trim(), config),
        Value::Int(i) => compact_date(*i).or_else(|| from_epoch(*i as f64)),
        Value::Float(f) => from_epoch(f.0),
    }
}

pub fn is_valid_timestamp(value: &Value, config: &TimestampConfig) -> bool {
    parse_timestamp(value, config).is_some()
}

/// Count invalid or missing timestamps in one column. Cells absent from
/// ragged rows count as missing.
pub fn count_invalid_timestamps(dataset: &Dataset, col: usize, config: &TimestampConfig) -> usize {
    dataset
        .rows()
        .iter()
        .filter(|row| match row.get(col) {
            Some(v) => !is_valid_timestamp(v, config),
            None => true,
        })
        .count()
}

fn parse_text(s: &str, config: &TimestampConfig) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in &config.formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in &config.date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Integers like `20240131` are compact dates, not epoch seconds.
fn compact_date(i: i64) -> Option<NaiveDateTime> {
    if !(19000101..=29991231).contains(&i) {
        return None;
    }
    let (y, md) = (i / 10_000, i % 10_000);
    NaiveDate::from_ymd_opt(y as i32, (md / 100) as u32, (md % 100) as u32)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn from_epoch(raw: f64) -> Option<NaiveDateTime> {
    if !raw.is_finite() {
        return None;
    }
    let millis = if raw.abs() >= EPOCH_MILLIS_THRESHOLD {
        raw
    } else {
        raw * 1000.0
    };
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.naive_utc())
}
