use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DedupError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (zero key-column cap, bad extension, etc.).
    ConfigValidation(String),
    /// A row carries more cells than the dataset has columns.
    RowWidth { label: String, row: usize, width: usize, columns: usize },
    /// A single column cannot be compared across rows. Recovered by the detector.
    ColumnCompare { label: String, column: String, reason: String },
    /// A cleaned dataset could not be written. Recovered per dataset.
    Persist { label: String, message: String },
    /// CSV decode error while loading a dataset.
    Csv(String),
    /// IO error (file read, directory creation, etc.).
    Io(String),
}

impl fmt::Display for DedupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::RowWidth { label, row, width, columns } => write!(
                f,
                "dataset '{label}': row {row} has {width} cells but only {columns} columns"
            ),
            Self::ColumnCompare { label, column, reason } => {
                write!(f, "dataset '{label}': cannot compare column '{column}': {reason}")
            }
            Self::Persist { label, message } => {
                write!(f, "dataset '{label}': cannot persist cleaned data: {message}")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for DedupError {}

impl From<std::io::Error> for DedupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
