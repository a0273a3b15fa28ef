use serde::{Deserialize, Serialize};

use crate::error::DedupError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine configuration. Every section has defaults, so an empty TOML
/// document is a valid config.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DedupConfig {
    /// Logs the engine's warnings at debug level instead. Skipped columns,
    /// skipped auxiliary datasets and timestamp issues still reach the report.
    #[serde(default)]
    pub suppress_warnings: bool,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub timestamps: TimestampConfig,
    #[serde(default)]
    pub remediation: RemediationConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

// ---------------------------------------------------------------------------
// Column classification
// ---------------------------------------------------------------------------

/// Name patterns used to tag columns once, when a dataset is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassificationConfig {
    /// Substrings (case-insensitive) marking a timestamp-like column.
    #[serde(default = "default_timestamp_markers")]
    pub timestamp_markers: Vec<String>,
    /// Exact names (case-insensitive) of domain-value columns.
    #[serde(default = "default_domain_vocabulary")]
    pub domain_vocabulary: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            timestamp_markers: default_timestamp_markers(),
            domain_vocabulary: default_domain_vocabulary(),
        }
    }
}

fn default_timestamp_markers() -> Vec<String> {
    vec!["time".into(), "date".into()]
}

fn default_domain_vocabulary() -> Vec<String> {
    ["open", "high", "low", "close", "volume", "vol"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Per-kind cap on key columns examined by the timestamp and domain passes.
    #[serde(default = "default_max_key_columns")]
    pub max_key_columns: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_key_columns: default_max_key_columns(),
        }
    }
}

fn default_max_key_columns() -> usize {
    3
}

// ---------------------------------------------------------------------------
// Timestamp validation
// ---------------------------------------------------------------------------

/// `strftime` patterns tried (after RFC 3339) when validating timestamp text.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimestampConfig {
    #[serde(default = "default_datetime_formats")]
    pub formats: Vec<String>,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            formats: default_datetime_formats(),
            date_formats: default_date_formats(),
        }
    }
}

fn default_datetime_formats() -> Vec<String> {
    [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y.%m.%d %H:%M:%S",
        "%Y.%m.%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%Y%m%d %H%M%S",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_date_formats() -> Vec<String> {
    ["%Y-%m-%d", "%Y.%m.%d", "%d/%m/%Y", "%Y%m%d"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Remediation + Concurrency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemediationConfig {
    /// Relative output root for cleaned datasets.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// File extension of cleaned datasets, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            extension: default_extension(),
        }
    }
}

fn default_output_dir() -> String {
    "cleaned_data".into()
}

fn default_extension() -> String {
    "csv".into()
}

/// Auxiliary datasets are independent, so they may be processed on a
/// bounded worker pool. Sequential by default.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConcurrencyConfig {
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DedupConfig {
    pub fn from_toml(input: &str) -> Result<Self, DedupError> {
        let config: DedupConfig =
            toml::from_str(input).map_err(|e| DedupError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Level the engine logs recoverable findings at.
    pub fn warning_level(&self) -> log::Level {
        if self.suppress_warnings {
            log::Level::Debug
        } else {
            log::Level::Warn
        }
    }

    pub fn to_toml(&self) -> Result<String, DedupError> {
        toml::to_string_pretty(self).map_err(|e| DedupError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), DedupError> {
        if self.detection.max_key_columns == 0 {
            return Err(DedupError::ConfigValidation(
                "detection.max_key_columns must be at least 1".into(),
            ));
        }

        if self.classification.timestamp_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(DedupError::ConfigValidation(
                "classification.timestamp_markers must contain a non-empty marker".into(),
            ));
        }

        if self.remediation.output_dir.trim().is_empty() {
            return Err(DedupError::ConfigValidation(
                "remediation.output_dir must not be empty".into(),
            ));
        }

        let ext = &self.remediation.extension;
        if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
            return Err(DedupError::ConfigValidation(format!(
                "remediation.extension must be a bare extension like \"csv\", got \"{ext}\""
            )));
        }

        if self.concurrency.workers == 0 {
            return Err(DedupError::ConfigValidation(
                "concurrency.workers must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = DedupConfig::from_toml("").unwrap();
        assert!(!config.suppress_warnings);
        assert_eq!(config.detection.max_key_columns, 3);
        assert_eq!(config.classification.timestamp_markers, vec!["time", "date"]);
        assert_eq!(config.classification.domain_vocabulary.len(), 6);
        assert_eq!(config.remediation.output_dir, "cleaned_data");
        assert_eq!(config.remediation.extension, "csv");
        assert!(!config.concurrency.parallel);
        assert_eq!(config.concurrency.workers, 4);
    }

    #[test]
    fn suppress_warnings_demotes_to_debug() {
        let mut config = DedupConfig::default();
        assert_eq!(config.warning_level(), log::Level::Warn);
        config.suppress_warnings = true;
        assert_eq!(config.warning_level(), log::Level::Debug);
    }

    #[test]
    fn parse_full_document() {
        let input = r#"
suppress_warnings = true

[classification]
timestamp_markers = ["time", "date", "ts"]
domain_vocabulary = ["open", "close"]

[detection]
max_key_columns = 5

[timestamps]
formats = ["%Y-%m-%d %H:%M:%S"]
date_formats = []

[remediation]
output_dir = "out"
extension = "tsv"

[concurrency]
parallel = true
workers = 2
"#;
        let config = DedupConfig::from_toml(input).unwrap();
        assert!(config.suppress_warnings);
        assert_eq!(config.classification.timestamp_markers.len(), 3);
        assert_eq!(config.classification.domain_vocabulary, vec!["open", "close"]);
        assert_eq!(config.detection.max_key_columns, 5);
        assert_eq!(config.timestamps.formats.len(), 1);
        assert!(config.timestamps.date_formats.is_empty());
        assert_eq!(config.remediation.output_dir, "out");
        assert_eq!(config.remediation.extension, "tsv");
        assert!(config.concurrency.parallel);
        assert_eq!(config.concurrency.workers, 2);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = DedupConfig::from_toml("[remediation]\noutput_dir = \"x\"\n").unwrap();
        assert_eq!(config.remediation.output_dir, "x");
        assert_eq!(config.remediation.extension, "csv");
    }

    #[test]
    fn reject_zero_key_columns() {
        let err = DedupConfig::from_toml("[detection]\nmax_key_columns = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_key_columns"));
    }

    #[test]
    fn reject_dotted_extension() {
        let err = DedupConfig::from_toml("[remediation]\nextension = \".csv\"\n").unwrap_err();
        assert!(err.to_string().contains("bare extension"));
    }

    #[test]
    fn reject_zero_workers() {
        let err = DedupConfig::from_toml("[concurrency]\nworkers = 0\n").unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn reject_wrong_type() {
        let err = DedupConfig::from_toml("[detection]\nmax_key_columns = \"three\"\n");
        assert!(matches!(err, Err(DedupError::ConfigParse(_))));
    }

    #[test]
    fn toml_roundtrip_of_defaults() {
        let text = DedupConfig::default().to_toml().unwrap();
        let parsed = DedupConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.detection.max_key_columns, 3);
        assert_eq!(parsed.timestamps.formats, default_datetime_formats());
    }
}
