//! `dupguard-dedup`: duplicate detection and remediation across a main
//! dataset and its auxiliary series.
//!
//! Pure engine crate: receives pre-loaded datasets, returns summaries and
//! reports. Loading, prompting and file formats belong to the callers; the
//! engine only sees them through [`PersistenceSink`] and [`ConsentProvider`].

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod consent;
pub mod detect;
pub mod engine;
pub mod error;
pub mod model;
mod pool;
pub mod progress;
pub mod remediate;
pub mod timestamp;

pub use aggregate::{Aggregator, MAIN_LABEL};
pub use classify::{classify_column, ColumnKind};
pub use config::DedupConfig;
pub use consent::{AlwaysProceed, ConsentProvider, FixedConsent, NeverProceed};
pub use detect::detect;
pub use engine::{run, Collaborators, RunInput, RunOutcome, RunState};
pub use error::DedupError;
pub use model::{
    AggregateReport, AuxiliarySeries, CriticalIssue, Dataset, DuplicateSummary, KeyColumnFinding,
    KeyKind, RemediationReport, Value,
};
pub use progress::{LogProgress, NoopProgress, ProgressObserver, ProgressUpdate};
pub use remediate::{remove_duplicates, PersistenceSink, RemediationPipeline};
