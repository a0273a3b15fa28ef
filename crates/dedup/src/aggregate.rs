use std::time::Duration;

use log::{info, log};

use crate::classify::ColumnKind;
use crate::config::DedupConfig;
use crate::detect::detect;
use crate::model::{
    is_skipped, percent_of, AggregateReport, AuxiliarySeries, CriticalIssue, Dataset,
    DatasetFindings, ReportMeta,
};
use crate::pool::map_ordered;
use crate::progress::{NoopProgress, Phase, ProgressObserver, ProgressTracker};
use crate::timestamp::count_invalid_timestamps;

/// Label the main dataset is reported under.
pub const MAIN_LABEL: &str = "main";

/// Runs the detector over the main dataset and every auxiliary series and
/// merges the findings into one report.
pub struct Aggregator<'a> {
    config: &'a DedupConfig,
    observer: &'a dyn ProgressObserver,
}

enum AuxOutcome {
    Skipped(String),
    Processed(DatasetFindings, Vec<CriticalIssue>),
}

impl<'a> Aggregator<'a> {
    pub fn new(config: &'a DedupConfig) -> Self {
        Self {
            config,
            observer: &NoopProgress,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn aggregate(&self, main: &Dataset, auxiliary: &AuxiliarySeries) -> AggregateReport {
        let mut datasets = Vec::with_capacity(auxiliary.len() + 1);
        let mut critical_issues = Vec::new();
        let mut skipped = Vec::new();

        let (findings, issues) = self.process(MAIN_LABEL, main);
        datasets.push(findings);
        critical_issues.extend(issues);

        let entries: Vec<(&str, Option<&Dataset>)> = auxiliary.iter().collect();
        let tracker = ProgressTracker::new(Phase::Aggregating, entries.len());
        if entries.is_empty() {
            self.observer
                .on_progress(&tracker.snapshot(MAIN_LABEL, 0, Duration::ZERO));
        }

        let outcomes = map_ordered(&entries, &self.config.concurrency, |&(label, dataset)| {
            let outcome = match dataset {
                Some(ds) if !is_skipped(dataset) => {
                    let (findings, issues) = self.process(label, ds);
                    AuxOutcome::Processed(findings, issues)
                }
                _ => {
                    log!(
                        self.config.warning_level(),
                        "{label}: auxiliary dataset is absent or empty, skipped"
                    );
                    AuxOutcome::Skipped(label.to_string())
                }
            };
            tracker.advance(label, self.observer);
            outcome
        });

        for outcome in outcomes {
            match outcome {
                AuxOutcome::Processed(findings, issues) => {
                    datasets.push(findings);
                    critical_issues.extend(issues);
                }
                AuxOutcome::Skipped(label) => skipped.push(label),
            }
        }

        let total_rows: usize = datasets.iter().map(|d| d.summary.row_count).sum();
        let total_duplicates: usize = datasets.iter().map(|d| d.summary.total_duplicates).sum();
        let overall_duplicate_percent = percent_of(total_duplicates, total_rows);

        info!(
            "aggregated {} dataset(s) ({} skipped): {total_duplicates} duplicate rows of {total_rows} ({overall_duplicate_percent:.2}%), {} critical issue(s)",
            datasets.len(),
            skipped.len(),
            critical_issues.len(),
        );

        AggregateReport {
            meta: ReportMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            datasets,
            skipped,
            auxiliary_total: entries.len(),
            total_rows,
            total_duplicates,
            overall_duplicate_percent,
            critical_issues,
        }
    }

    fn process(&self, label: &str, dataset: &Dataset) -> (DatasetFindings, Vec<CriticalIssue>) {
        let summary = detect(dataset, self.config);
        info!(
            "{label}: {} duplicate rows of {} ({:.2}%)",
            summary.total_duplicates, summary.row_count, summary.duplicate_percent
        );
        let issues = scan_critical_issues(label, dataset, self.config);
        (
            DatasetFindings {
                label: label.to_string(),
                summary,
            },
            issues,
        )
    }
}

/// One issue per timestamp-like column holding invalid or missing values.
/// Every timestamp-like column is scanned, not only the detector's capped set.
pub fn scan_critical_issues(label: &str, dataset: &Dataset, config: &DedupConfig) -> Vec<CriticalIssue> {
    dataset
        .columns_of_kind(ColumnKind::Timestamp)
        .into_iter()
        .filter_map(|col| {
            let invalid_count = count_invalid_timestamps(dataset, col, &config.timestamps);
            (invalid_count > 0).then(|| {
                let issue = CriticalIssue {
                    label: label.to_string(),
                    column: dataset.columns()[col].name.clone(),
                    invalid_count,
                };
                log!(config.warning_level(), "critical: {issue}");
                issue
            })
        })
        .collect()
}
