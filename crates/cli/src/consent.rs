//! Interactive confirmation before remediation.

use std::io::{self, BufRead, Write};

use dupguard_dedup::{AggregateReport, ConsentProvider};

/// Asks on stderr, reads the answer from stdin. Empty input means yes.
/// When stdin is not a terminal there is nobody to ask, so the run proceeds.
pub struct StdinConsent;

impl ConsentProvider for StdinConsent {
    fn confirm(&self, report: &AggregateReport) -> bool {
        if !atty::is(atty::Stream::Stdin) {
            log::info!("stdin is not a terminal; proceeding with remediation");
            return true;
        }

        eprint!("{}", prompt(report));
        io::stderr().flush().ok();

        let mut buf = String::new();
        match io::stdin().lock().read_line(&mut buf) {
            Ok(_) => parse_answer(&buf),
            Err(e) => {
                log::warn!("cannot read confirmation: {e}");
                false
            }
        }
    }
}

pub fn prompt(report: &AggregateReport) -> String {
    format!("Remove duplicates from {} dataset(s)? [Y/n] ", report.datasets.len())
}

/// Anything but an explicit "n"/"no" counts as consent.
pub fn parse_answer(answer: &str) -> bool {
    let answer = answer.trim().to_ascii_lowercase();
    !matches!(answer.as_str(), "n" | "no")
}
