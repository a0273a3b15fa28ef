use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::aggregate::Aggregator;
use crate::config::DedupConfig;
use crate::consent::ConsentProvider;
use crate::model::{AggregateReport, AuxiliarySeries, Dataset, RemediationReport};
use crate::progress::ProgressObserver;
use crate::remediate::{PersistenceSink, RemediationPipeline};

/// Pre-loaded datasets for one run.
pub struct RunInput {
    pub main: Dataset,
    pub auxiliary: AuxiliarySeries,
}

/// External capabilities injected into a run.
pub struct Collaborators<'a> {
    pub consent: &'a dyn ConsentProvider,
    pub sink: &'a dyn PersistenceSink,
    pub observer: &'a dyn ProgressObserver,
    /// Overrides `remediation.output_dir` when set.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Detecting,
    Aggregating,
    AwaitingConsent,
    Remediating,
    Skipped,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// States visited, in order. Always ends with `Done`.
    pub states: Vec<RunState>,
    pub aggregate: AggregateReport,
    /// Present only when consent was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<RemediationReport>,
}

impl RunOutcome {
    pub fn remediated(&self) -> bool {
        self.remediation.is_some()
    }
}

/// Detect, aggregate, ask for consent, and remediate if granted.
///
/// Once remediation starts it runs to completion; per-dataset failures are
/// reported in the remediation report, never rolled back.
pub fn run(config: &DedupConfig, input: &RunInput, collaborators: &Collaborators<'_>) -> RunOutcome {
    let mut states = vec![RunState::Detecting, RunState::Aggregating];

    let aggregate = Aggregator::new(config)
        .with_observer(collaborators.observer)
        .aggregate(&input.main, &input.auxiliary);

    states.push(RunState::AwaitingConsent);
    let remediation = if collaborators.consent.confirm(&aggregate) {
        states.push(RunState::Remediating);
        let mut pipeline =
            RemediationPipeline::new(config, collaborators.sink).with_observer(collaborators.observer);
        if let Some(ref dir) = collaborators.output_dir {
            pipeline = pipeline.with_output_dir(dir.clone());
        }
        Some(pipeline.remediate(&input.main, &input.auxiliary, &aggregate))
    } else {
        info!("remediation declined; returning findings only");
        states.push(RunState::Skipped);
        None
    };

    states.push(RunState::Done);
    RunOutcome {
        states,
        aggregate,
        remediation,
    }
}
