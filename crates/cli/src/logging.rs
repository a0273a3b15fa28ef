//! Log output for the CLI.
//!
//! The engine crates log through `log`; records reach this subscriber via
//! its `tracing-log` bridge. Everything goes to stderr so stdout stays clean
//! for `--json`.

use tracing_subscriber::EnvFilter;

/// Default directive for the given flags. `RUST_LOG`, when set, wins.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    // Fails only if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_directive(0, false), "warn");
        assert_eq!(default_directive(1, false), "info");
        assert_eq!(default_directive(4, false), "debug");
        assert_eq!(default_directive(2, true), "error");
    }
}
