//! Four-pass duplicate detection over a single dataset.
//!
//! Passes run independently and a row may be counted by more than one:
//! 1. exact row (all columns) -> `total_duplicates`
//! 2. each timestamp-like column, up to `max_key_columns`
//! 3. each domain-value column, up to `max_key_columns`
//! 4. (first timestamp column, first domain column) pair
//!
//! Every pass keeps the first occurrence and flags later repeats.

use std::collections::HashSet;
use std::hash::Hash;

use log::{debug, log};

use crate::classify::ColumnKind;
use crate::config::DedupConfig;
use crate::error::DedupError;
use crate::model::{percent_of, Dataset, DuplicateSummary, KeyColumnFinding, KeyKind, Value, NULL};

/// Flags every key equal to an earlier key. First occurrences are `false`.
pub fn first_occurrence_mask<K, I>(keys: I) -> Vec<bool>
where
    K: Hash + Eq,
    I: IntoIterator<Item = K>,
{
    let mut seen = HashSet::new();
    keys.into_iter().map(|k| !seen.insert(k)).collect()
}

/// Exact-row duplicate mask. Cells missing from ragged rows compare as null.
pub fn duplicated_rows(dataset: &Dataset) -> Vec<bool> {
    let width = dataset.column_count();
    first_occurrence_mask(dataset.rows().iter().map(|row| {
        row.iter()
            .chain(std::iter::repeat(&NULL))
            .take(width)
            .collect::<Vec<&Value>>()
    }))
}

/// Values of one column, failing if any row cannot supply it.
pub fn column_values(dataset: &Dataset, col: usize) -> Result<Vec<&Value>, DedupError> {
    let column = dataset.columns().get(col).ok_or_else(|| DedupError::ColumnCompare {
        label: dataset.label().into(),
        column: format!("#{col}"),
        reason: "no such column".into(),
    })?;

    dataset
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.get(col).ok_or_else(|| DedupError::ColumnCompare {
                label: dataset.label().into(),
                column: column.name.clone(),
                reason: format!("row {i} has no value"),
            })
        })
        .collect()
}

fn count_flagged(mask: &[bool]) -> usize {
    mask.iter().filter(|&&d| d).count()
}

/// Run all four passes. Never fails: columns that cannot be compared are
/// skipped with a zero contribution and listed in `skipped_columns`.
pub fn detect(dataset: &Dataset, config: &DedupConfig) -> DuplicateSummary {
    let row_count = dataset.row_count();
    let total_duplicates = count_flagged(&duplicated_rows(dataset));
    debug!(
        "{}: exact-row pass found {total_duplicates} of {row_count} rows",
        dataset.label()
    );

    let mut key_columns = Vec::new();
    let mut skipped_columns = Vec::new();
    let cap = config.detection.max_key_columns;

    let timestamp_cols = dataset.columns_of_kind(ColumnKind::Timestamp);
    let domain_cols = dataset.columns_of_kind(ColumnKind::DomainValue);

    let timestamp_based_duplicates = key_column_pass(
        dataset,
        &timestamp_cols[..timestamp_cols.len().min(cap)],
        KeyKind::Timestamp,
        config,
        &mut key_columns,
        &mut skipped_columns,
    );
    let ohlcv_based_duplicates = key_column_pass(
        dataset,
        &domain_cols[..domain_cols.len().min(cap)],
        KeyKind::Ohlcv,
        config,
        &mut key_columns,
        &mut skipped_columns,
    );

    if let (Some(&ts_col), Some(&dom_col)) = (timestamp_cols.first(), domain_cols.first()) {
        let columns = dataset.columns();
        let name = format!("{}+{}", columns[ts_col].name, columns[dom_col].name);
        match pair_duplicates(dataset, ts_col, dom_col) {
            Ok(count) => {
                debug!("{}: business-logic pass on {name} found {count}", dataset.label());
                key_columns.push(KeyColumnFinding {
                    column: name,
                    duplicate_count: count,
                    kind: KeyKind::BusinessLogic,
                });
            }
            Err(e) => {
                report_skip(&e, config);
                skipped_columns.push(name);
            }
        }
    }

    DuplicateSummary {
        row_count,
        total_duplicates,
        duplicate_percent: percent_of(total_duplicates, row_count),
        timestamp_based_duplicates,
        ohlcv_based_duplicates,
        key_columns,
        skipped_columns,
    }
}

/// Single-column passes. Returns the summed count; appends a finding for
/// each column with at least one duplicate.
fn key_column_pass(
    dataset: &Dataset,
    cols: &[usize],
    kind: KeyKind,
    config: &DedupConfig,
    key_columns: &mut Vec<KeyColumnFinding>,
    skipped_columns: &mut Vec<String>,
) -> usize {
    let mut total = 0;
    for &col in cols {
        let name = &dataset.columns()[col].name;
        match column_values(dataset, col) {
            Ok(values) => {
                let count = count_flagged(&first_occurrence_mask(values));
                debug!("{}: {kind} pass on {name} found {count}", dataset.label());
                if count > 0 {
                    key_columns.push(KeyColumnFinding {
                        column: name.clone(),
                        duplicate_count: count,
                        kind,
                    });
                    total += count;
                }
            }
            Err(e) => {
                report_skip(&e, config);
                skipped_columns.push(name.clone());
            }
        }
    }
    total
}

fn pair_duplicates(dataset: &Dataset, left: usize, right: usize) -> Result<usize, DedupError> {
    let left_values = column_values(dataset, left)?;
    let right_values = column_values(dataset, right)?;
    let mask = first_occurrence_mask(left_values.into_iter().zip(right_values));
    Ok(count_flagged(&mask))
}

fn report_skip(err: &DedupError, config: &DedupConfig) {
    log!(config.warning_level(), "{err}; column skipped");
}
