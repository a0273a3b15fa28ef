//! Cleaned-dataset persistence as CSV files.

use std::fs;
use std::path::{Path, PathBuf};

use dupguard_dedup::{Dataset, DedupError, PersistenceSink};

use crate::csv::write_dataset;

/// `cleaned_<label>_dataset_<run_timestamp>.<extension>`, label lowercased.
pub fn output_file_name(label: &str, run_timestamp: &str, extension: &str) -> String {
    format!(
        "cleaned_{}_dataset_{run_timestamp}.{extension}",
        label.to_lowercase()
    )
}

/// Writes each cleaned dataset as a CSV file under the run's output directory,
/// creating the directory on first use.
#[derive(Debug, Clone)]
pub struct CsvSink {
    extension: String,
}

impl CsvSink {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl Default for CsvSink {
    fn default() -> Self {
        Self::new("csv")
    }
}

impl PersistenceSink for CsvSink {
    fn persist(
        &self,
        label: &str,
        dataset: &Dataset,
        output_dir: &Path,
        run_timestamp: &str,
    ) -> Result<PathBuf, DedupError> {
        let persist_err = |message: String| DedupError::Persist {
            label: label.to_string(),
            message,
        };

        fs::create_dir_all(output_dir)
            .map_err(|e| persist_err(format!("cannot create {}: {e}", output_dir.display())))?;

        let path = output_dir.join(output_file_name(label, run_timestamp, &self.extension));
        write_dataset(dataset, &path)
            .map_err(|e| persist_err(format!("cannot write {}: {e}", path.display())))?;
        Ok(path)
    }
}
