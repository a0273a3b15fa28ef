use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};

use crate::classify::{classify_columns, ColumnKind};
use crate::config::ClassificationConfig;
use crate::error::DedupError;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Raw text that loaders map to [`Value::Null`] (compared case-insensitively).
const NULL_MARKERS: &[&str] = &["na", "n/a", "nan", "null", "none"];

/// A single cell. Floats compare by total order, so rows and keys can be
/// hashed; `NaN == NaN` and `-0.0 == 0.0`. Numbers compare by value across
/// variants: `Int(1) == Float(1.0)`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(OrderedFloat<f64>),
    Text(String),
}

impl Value {
    /// Infer a value from loader text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || NULL_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m)) {
            return Self::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Int(i);
        }
        // Integer literals beyond i64 stay text; a float would merge neighbours
        if is_integer_literal(trimmed) {
            return Self::Text(raw.to_string());
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Self::Float(OrderedFloat(f));
            }
        }
        Self::Text(raw.to_string())
    }

    pub fn float(f: f64) -> Self {
        Self::Float(OrderedFloat(f))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// What equality, hashing and ordering look at.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
enum CompareKey<'a> {
    Null,
    Int(i64),
    Float(OrderedFloat<f64>),
    Text(&'a str),
}

impl Value {
    fn compare_key(&self) -> CompareKey<'_> {
        match self {
            Self::Null => CompareKey::Null,
            Self::Int(i) => CompareKey::Int(*i),
            Self::Float(f) => match integral(f.0) {
                Some(i) => CompareKey::Int(i),
                None => CompareKey::Float(*f),
            },
            Self::Text(s) => CompareKey::Text(s),
        }
    }
}

/// `Some(i)` when `f` is a whole number that `i64` holds exactly.
fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 is 2^63, one past the largest i64
    let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&f);
    (in_range && f.fract() == 0.0).then_some(f as i64)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare_key() == other.compare_key()
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.compare_key().hash(state);
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_key().cmp(&other.compare_key())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{}", v.0),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::float(f)
    }
}

/// Filler for cells missing from ragged rows.
pub(crate) static NULL: Value = Value::Null;

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Named, ordered rows over a fixed set of classified columns.
///
/// Rows may be shorter than the header (flexible CSV input) but never longer.
/// Datasets built from text records keep each cell's source text, so a
/// cleaned copy can be written back without reformatting numbers or markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    label: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
    source: Option<Vec<Vec<String>>>,
}

impl Dataset {
    /// Build a dataset classifying columns with the default vocabulary.
    pub fn new(
        label: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, DedupError> {
        Self::classified(label, columns, rows, &ClassificationConfig::default())
    }

    pub fn classified(
        label: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
        classification: &ClassificationConfig,
    ) -> Result<Self, DedupError> {
        let label = label.into();
        let width = columns.len();
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() > width) {
            return Err(DedupError::RowWidth {
                label,
                row,
                width: cells.len(),
                columns: width,
            });
        }

        let kinds = classify_columns(&columns, classification);
        let columns = columns
            .into_iter()
            .zip(kinds)
            .map(|(name, kind)| Column { name, kind })
            .collect();

        Ok(Self { label, columns, rows, source: None })
    }

    /// Build from raw text records, inferring each value with [`Value::parse`]
    /// and keeping the text for [`source_row`](Self::source_row).
    pub fn from_records(
        label: impl Into<String>,
        columns: Vec<String>,
        records: Vec<Vec<String>>,
        classification: &ClassificationConfig,
    ) -> Result<Self, DedupError> {
        let rows = records
            .iter()
            .map(|record| record.iter().map(|cell| Value::parse(cell)).collect())
            .collect();
        let mut dataset = Self::classified(label, columns, rows, classification)?;
        dataset.source = Some(records);
        Ok(dataset)
    }

    /// Same label and columns, keeping only rows whose `keep` flag is set.
    /// Source text follows its row.
    pub(crate) fn retain_rows(&self, keep: &[bool]) -> Self {
        fn filter<T: Clone>(items: &[T], keep: &[bool]) -> Vec<T> {
            items
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(item, _)| item.clone())
                .collect()
        }

        Self {
            label: self.label.clone(),
            columns: self.columns.clone(),
            rows: filter(&self.rows, keep),
            source: self.source.as_deref().map(|src| filter(src, keep)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Indices of columns of `kind`, in column order.
    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text exactly as loaded, when the dataset came from text records.
    pub fn source_row(&self, row: usize) -> Option<&[String]> {
        self.source.as_ref()?.get(row).map(Vec::as_slice)
    }

    /// `None` when the row is out of range or too short to hold the column.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

// ---------------------------------------------------------------------------
// Auxiliary series
// ---------------------------------------------------------------------------

/// Insertion-ordered `label -> dataset` map. A `None` entry is a series the
/// source could not provide.
#[derive(Debug, Clone, Default)]
pub struct AuxiliarySeries {
    entries: Vec<(String, Option<Dataset>)>,
}

impl AuxiliarySeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Replacing keeps the label's original position.
    pub fn insert(&mut self, label: impl Into<String>, dataset: Dataset) {
        self.put(label.into(), Some(dataset));
    }

    /// Record a series that is expected but unavailable.
    pub fn insert_absent(&mut self, label: impl Into<String>) {
        self.put(label.into(), None);
    }

    fn put(&mut self, label: String, dataset: Option<Dataset>) {
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = dataset,
            None => self.entries.push((label, dataset)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&Dataset> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, d)| d.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Dataset>)> {
        self.entries.iter().map(|(l, d)| (l.as_str(), d.as_ref()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Dataset)> for AuxiliarySeries {
    fn from_iter<I: IntoIterator<Item = (String, Dataset)>>(iter: I) -> Self {
        let mut series = Self::new();
        for (label, dataset) in iter {
            series.insert(label, dataset);
        }
        series
    }
}

/// True when the aggregator and the pipeline skip this auxiliary entry.
pub(crate) fn is_skipped(dataset: Option<&Dataset>) -> bool {
    dataset.map_or(true, Dataset::is_empty)
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Timestamp,
    Ohlcv,
    BusinessLogic,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp => write!(f, "timestamp"),
            Self::Ohlcv => write!(f, "ohlcv"),
            Self::BusinessLogic => write!(f, "business_logic"),
        }
    }
}

/// One key-column (or key-pair) pass result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyColumnFinding {
    /// Column name, or `"<timestamp>+<domain>"` for the business-logic pair.
    pub column: String,
    pub duplicate_count: usize,
    pub kind: KeyKind,
}

/// Per-dataset detection result.
///
/// `total_duplicates` comes from the exact-row pass only. The per-key counts
/// are independent and may overlap with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateSummary {
    pub row_count: usize,
    pub total_duplicates: usize,
    pub duplicate_percent: f64,
    pub timestamp_based_duplicates: usize,
    pub ohlcv_based_duplicates: usize,
    pub key_columns: Vec<KeyColumnFinding>,
    /// Key columns that could not be compared and contributed zero.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_columns: Vec<String>,
}

/// `part / whole * 100`, zero for an empty whole.
pub(crate) fn percent_of(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Invalid or missing timestamp values in one column. Never auto-remediated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalIssue {
    pub label: String,
    pub column: String,
    pub invalid_count: usize,
}

impl fmt::Display for CriticalIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} invalid timestamp values in {}",
            self.label, self.invalid_count, self.column
        )
    }
}

impl Serialize for CriticalIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetFindings {
    pub label: String,
    pub summary: DuplicateSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub meta: ReportMeta,
    /// Processed datasets: main first, then auxiliary in insertion order.
    pub datasets: Vec<DatasetFindings>,
    /// Auxiliary labels that were absent or empty.
    pub skipped: Vec<String>,
    /// Auxiliary entries seen, processed or not.
    pub auxiliary_total: usize,
    pub total_rows: usize,
    pub total_duplicates: usize,
    pub overall_duplicate_percent: f64,
    pub critical_issues: Vec<CriticalIssue>,
}

impl AggregateReport {
    pub fn summary(&self, label: &str) -> Option<&DuplicateSummary> {
        self.datasets
            .iter()
            .find(|d| d.label == label)
            .map(|d| &d.summary)
    }

    pub fn has_duplicates(&self) -> bool {
        self.total_duplicates > 0
    }

    pub fn has_critical_issues(&self) -> bool {
        !self.critical_issues.is_empty()
    }

    pub fn critical_issue_messages(&self) -> Vec<String> {
        self.critical_issues.iter().map(|c| c.to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// Remediation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRemediation {
    pub label: String,
    pub original_rows: usize,
    pub removed: usize,
    pub remaining_rows: usize,
    /// `None` when persistence failed; see `error`.
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatasetRemediation {
    pub fn succeeded(&self) -> bool {
        self.output_path.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemediationReport {
    pub run_timestamp: String,
    pub fixed_count: usize,
    pub per_dataset: Vec<DatasetRemediation>,
    /// Labels whose cleaned data could not be persisted.
    pub failed: Vec<String>,
    /// Verbatim copy of the aggregate report's critical issues.
    pub unresolved_critical_issues: Vec<CriticalIssue>,
}

impl RemediationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn entry(&self, label: &str) -> Option<&DatasetRemediation> {
        self.per_dataset.iter().find(|d| d.label == label)
    }
}
