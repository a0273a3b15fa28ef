//! Duplicate removal and persistence of cleaned datasets.
//!
//! The removal mask is recomputed from each dataset's current rows with the
//! exact-row rule; detector counts are never reused. Persistence failures are
//! recorded against the failing dataset only.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::aggregate::MAIN_LABEL;
use crate::config::DedupConfig;
use crate::detect::duplicated_rows;
use crate::error::DedupError;
use crate::model::{is_skipped, AggregateReport, AuxiliarySeries, Dataset, DatasetRemediation, RemediationReport};
use crate::pool::map_ordered;
use crate::progress::{NoopProgress, Phase, ProgressObserver, ProgressTracker};

/// Format of the run timestamp shared by every output of one run.
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes a cleaned dataset somewhere durable.
pub trait PersistenceSink: Send + Sync {
    /// Persist `dataset` under `output_dir`, returning where it landed.
    fn persist(
        &self,
        label: &str,
        dataset: &Dataset,
        output_dir: &Path,
        run_timestamp: &str,
    ) -> Result<PathBuf, DedupError>;
}

pub fn run_timestamp() -> String {
    chrono::Local::now().format(RUN_TIMESTAMP_FORMAT).to_string()
}

/// Drop every later exact-row duplicate, keeping first occurrences in order.
/// Returns the cleaned copy and the number of rows removed.
pub fn remove_duplicates(dataset: &Dataset) -> (Dataset, usize) {
    let keep: Vec<bool> = duplicated_rows(dataset).iter().map(|dup| !dup).collect();
    let removed = keep.iter().filter(|&&k| !k).count();
    (dataset.retain_rows(&keep), removed)
}

pub struct RemediationPipeline<'a> {
    config: &'a DedupConfig,
    sink: &'a dyn PersistenceSink,
    observer: &'a dyn ProgressObserver,
    output_dir: PathBuf,
}

impl<'a> RemediationPipeline<'a> {
    pub fn new(config: &'a DedupConfig, sink: &'a dyn PersistenceSink) -> Self {
        Self {
            config,
            sink,
            observer: &NoopProgress,
            output_dir: PathBuf::from(&config.remediation.output_dir),
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Override the configured output root.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn remediate(
        &self,
        main: &Dataset,
        auxiliary: &AuxiliarySeries,
        report: &AggregateReport,
    ) -> RemediationReport {
        self.remediate_at(main, auxiliary, report, &run_timestamp())
    }

    /// Same as [`remediate`](Self::remediate) with an explicit run timestamp.
    pub fn remediate_at(
        &self,
        main: &Dataset,
        auxiliary: &AuxiliarySeries,
        report: &AggregateReport,
        run_timestamp: &str,
    ) -> RemediationReport {
        // Same order and skip rule as aggregation: main, then non-empty auxiliaries.
        let mut targets: Vec<(&str, &Dataset)> = vec![(MAIN_LABEL, main)];
        targets.extend(
            auxiliary
                .iter()
                .filter(|(_, ds)| !is_skipped(*ds))
                .filter_map(|(label, ds)| ds.map(|ds| (label, ds))),
        );

        info!(
            "remediating {} dataset(s) into {} (run {run_timestamp})",
            targets.len(),
            self.output_dir.display()
        );

        let tracker = ProgressTracker::new(Phase::Remediating, targets.len());
        let per_dataset = map_ordered(&targets, &self.config.concurrency, |&(label, dataset)| {
            let entry = self.remediate_one(label, dataset, run_timestamp);
            tracker.advance(label, self.observer);
            entry
        });

        let fixed_count = per_dataset.iter().map(|d| d.removed).sum();
        let failed: Vec<String> = per_dataset
            .iter()
            .filter(|d| !d.succeeded())
            .map(|d| d.label.clone())
            .collect();

        if failed.is_empty() {
            info!("removed {fixed_count} duplicate rows in total");
        } else {
            warn!(
                "removed {fixed_count} duplicate rows; {} dataset(s) failed to persist: {}",
                failed.len(),
                failed.join(", ")
            );
        }
        for issue in &report.critical_issues {
            warn!("unresolved: {issue}");
        }

        RemediationReport {
            run_timestamp: run_timestamp.to_string(),
            fixed_count,
            per_dataset,
            failed,
            unresolved_critical_issues: report.critical_issues.clone(),
        }
    }

    fn remediate_one(&self, label: &str, dataset: &Dataset, run_timestamp: &str) -> DatasetRemediation {
        let (cleaned, removed) = remove_duplicates(dataset);
        let remaining_rows = cleaned.row_count();

        let (output_path, error) =
            match self.sink.persist(label, &cleaned, &self.output_dir, run_timestamp) {
                Ok(path) => {
                    info!("{label}: removed {removed} rows, wrote {}", path.display());
                    (Some(path), None)
                }
                Err(e) => {
                    warn!("{label}: removed {removed} rows in memory but {e}");
                    (None, Some(e.to_string()))
                }
            };

        DatasetRemediation {
            label: label.to_string(),
            original_rows: dataset.row_count(),
            removed,
            remaining_rows,
            output_path,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::model::Value;
    use parking_lot::Mutex;

    /// Records what it was given; fails for labels in `fail`.
    #[derive(Default)]
    struct MemorySink {
        fail: Vec<String>,
        written: Mutex<Vec<(String, Dataset, String)>>,
    }

    impl PersistenceSink for MemorySink {
        fn persist(
            &self,
            label: &str,
            dataset: &Dataset,
            output_dir: &Path,
            run_timestamp: &str,
        ) -> Result<PathBuf, DedupError> {
            if self.fail.iter().any(|f| f == label) {
                return Err(DedupError::Persist {
                    label: label.into(),
                    message: "disk full".into(),
                });
            }
            self.written
                .lock()
                .push((label.to_string(), dataset.clone(), run_timestamp.to_string()));
            Ok(output_dir.join(format!("{label}.csv")))
        }
    }

    fn rows(values: &[i64]) -> Vec<Vec<Value>> {
        values.iter().map(|v| vec![Value::Int(*v)]).collect()
    }

    fn ds(label: &str, values: &[i64]) -> Dataset {
        Dataset::new(label, vec!["Open".into()], rows(values)).unwrap()
    }

    fn run(
        config: &DedupConfig,
        sink: &MemorySink,
        main: &Dataset,
        aux: &AuxiliarySeries,
    ) -> RemediationReport {
        let report = Aggregator::new(config).aggregate(main, aux);
        RemediationPipeline::new(config, sink)
            .with_output_dir("out")
            .remediate_at(main, aux, &report, "20260101_120000")
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let (cleaned, removed) = remove_duplicates(&ds("main", &[1, 2, 1]));
        assert_eq!(removed, 1);
        assert_eq!(cleaned.rows(), rows(&[1, 2]).as_slice());
        assert_eq!(cleaned.label(), "main");
    }

    #[test]
    fn clean_dataset_is_unchanged_but_persisted() {
        let config = DedupConfig::default();
        let sink = MemorySink::default();
        let main = ds("main", &[1, 2, 3]);
        let report = run(&config, &sink, &main, &AuxiliarySeries::new());
        assert_eq!(report.fixed_count, 0);
        let written = sink.written.lock();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].1, main);
    }

    #[test]
    fn shared_run_timestamp_and_order() {
        let config = DedupConfig::default();
        let sink = MemorySink::default();
        let mut aux = AuxiliarySeries::new();
        aux.insert("M5", ds("M5", &[1, 1, 1]));
        aux.insert_absent("H1");
        aux.insert("M1", ds("M1", &[4, 5, 4]));
        let report = run(&config, &sink, &ds("main", &[7, 7]), &aux);

        let labels: Vec<_> = report.per_dataset.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["main", "M5", "M1"]);
        assert_eq!(report.fixed_count, 1 + 2 + 1);
        assert!(sink.written.lock().iter().all(|(_, _, ts)| ts == "20260101_120000"));
        assert_eq!(report.run_timestamp, "20260101_120000");
        assert!(report.is_complete());
    }

    #[test]
    fn persistence_failure_is_isolated() {
        let config = DedupConfig::default();
        let sink = MemorySink {
            fail: vec!["main".into()],
            ..Default::default()
        };
        let mut aux = AuxiliarySeries::new();
        aux.insert("M5", ds("M5", &[1, 1, 2]));
        let report = run(&config, &sink, &ds("main", &[3, 3, 3]), &aux);

        let main = report.entry("main").unwrap();
        assert!(!main.succeeded());
        assert_eq!(main.removed, 2);
        assert!(main.error.as_deref().unwrap().contains("disk full"));

        let m5 = report.entry("M5").unwrap();
        assert!(m5.succeeded());
        assert_eq!(m5.removed, 1);
        assert_eq!(m5.output_path, Some(PathBuf::from("out/M5.csv")));

        assert_eq!(report.fixed_count, 3);
        assert_eq!(report.failed, vec!["main"]);
        assert!(!report.is_complete());
    }

    #[test]
    fn critical_issues_are_copied_verbatim() {
        let config = DedupConfig::default();
        let sink = MemorySink::default();
        let main = Dataset::new(
            "main",
            vec!["Timestamp".into()],
            vec![vec![Value::text("bad")], vec![Value::text("bad")]],
        )
        .unwrap();
        let aggregate = Aggregator::new(&config).aggregate(&main, &AuxiliarySeries::new());
        let report = RemediationPipeline::new(&config, &sink).remediate_at(
            &main,
            &AuxiliarySeries::new(),
            &aggregate,
            "20260101_000000",
        );
        assert_eq!(report.fixed_count, 1);
        assert_eq!(report.unresolved_critical_issues, aggregate.critical_issues);
        assert_eq!(
            report.unresolved_critical_issues[0].to_string(),
            "main: 2 invalid timestamp values in Timestamp"
        );
    }

    #[test]
    fn default_output_dir_from_config() {
        let config = DedupConfig::default();
        let sink = MemorySink::default();
        let pipeline = RemediationPipeline::new(&config, &sink);
        assert_eq!(pipeline.output_dir(), Path::new("cleaned_data"));
    }

    #[test]
    fn run_timestamp_shape() {
        let ts = run_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn parallel_remediation_keeps_order_and_totals() {
        let mut config = DedupConfig::default();
        config.concurrency.parallel = true;
        config.concurrency.workers = 3;
        let sink = MemorySink {
            fail: vec!["S3".into()],
            ..Default::default()
        };
        let aux: AuxiliarySeries = (0..8)
            .map(|i| (format!("S{i}"), ds(&format!("S{i}"), &[1, 1, 2, 2, 3])))
            .collect();
        let report = run(&config, &sink, &ds("main", &[1]), &aux);

        let labels: Vec<_> = report.per_dataset.iter().map(|d| d.label.clone()).collect();
        let mut expected = vec!["main".to_string()];
        expected.extend((0..8).map(|i| format!("S{i}")));
        assert_eq!(labels, expected);
        assert_eq!(report.fixed_count, 8 * 2);
        assert_eq!(report.failed, vec!["S3"]);
    }
}
