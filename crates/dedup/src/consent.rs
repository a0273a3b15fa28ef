//! Operator consent as an injected capability.
//!
//! The engine never prompts. Interactive surfaces live in the CLI and hand
//! back an already-resolved decision.

use crate::model::AggregateReport;

pub trait ConsentProvider {
    /// Decide whether to remediate, given the findings.
    fn confirm(&self, report: &AggregateReport) -> bool;
}

/// Always remediate. The default-yes policy for non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysProceed;

impl ConsentProvider for AlwaysProceed {
    fn confirm(&self, _report: &AggregateReport) -> bool {
        true
    }
}

/// Never remediate; detection-only runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverProceed;

impl ConsentProvider for NeverProceed {
    fn confirm(&self, _report: &AggregateReport) -> bool {
        false
    }
}

/// A decision made ahead of time.
#[derive(Debug, Clone, Copy)]
pub struct FixedConsent(pub bool);

impl ConsentProvider for FixedConsent {
    fn confirm(&self, _report: &AggregateReport) -> bool {
        self.0
    }
}
