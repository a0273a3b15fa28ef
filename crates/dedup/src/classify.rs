//! Column classification by name.
//!
//! Runs once when a [`Dataset`](crate::model::Dataset) is built; the detector
//! and the timestamp scan read the cached kinds instead of re-matching names.

use serde::Serialize;

use crate::config::ClassificationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Timestamp,
    DomainValue,
    Opaque,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timestamp => write!(f, "timestamp"),
            Self::DomainValue => write!(f, "domain_value"),
            Self::Opaque => write!(f, "opaque"),
        }
    }
}

/// Classify a single column name. Timestamp markers win over the domain
/// vocabulary, so `close_time` is timestamp-like.
pub fn classify_column(name: &str, config: &ClassificationConfig) -> ColumnKind {
    let lowered = name.trim().to_lowercase();

    let is_timestamp = config
        .timestamp_markers
        .iter()
        .filter(|m| !m.is_empty())
        .any(|m| lowered.contains(&m.to_lowercase()));
    if is_timestamp {
        return ColumnKind::Timestamp;
    }

    if config
        .domain_vocabulary
        .iter()
        .any(|v| v.to_lowercase() == lowered)
    {
        return ColumnKind::DomainValue;
    }

    ColumnKind::Opaque
}

pub fn classify_columns<S: AsRef<str>>(names: &[S], config: &ClassificationConfig) -> Vec<ColumnKind> {
    names
        .iter()
        .map(|n| classify_column(n.as_ref(), config))
        .collect()
}
