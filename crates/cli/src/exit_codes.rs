//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! | Code | Trigger                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success                                                    |
//! | 1    | General error (unspecified)                                |
//! | 2    | CLI usage error (bad args, malformed `--aux` value)        |
//! | 3    | Duplicates found (`scan --fail-on-duplicates`)             |
//! | 4    | Critical timestamp issues present (`--fail-on-critical`)   |
//! | 5    | One or more cleaned datasets failed to persist             |
//! | 6    | Invalid configuration file                                 |
//! | 7    | Input file could not be read or parsed                     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use dupguard_dedup::DedupError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Duplicate rows found and `--fail-on-duplicates` was given.
pub const EXIT_DUPLICATES: u8 = 3;

/// Invalid timestamp values found and `--fail-on-critical` was given.
pub const EXIT_CRITICAL: u8 = 4;

/// Remediation ran but at least one dataset could not be written.
pub const EXIT_PERSIST: u8 = 5;

/// Config file missing, malformed, or failing validation.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// Main or auxiliary input could not be read or parsed.
pub const EXIT_INPUT: u8 = 7;

/// Map an engine error to its exit code.
pub fn dedup_exit_code(err: &DedupError) -> u8 {
    match err {
        DedupError::ConfigParse(_) | DedupError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        DedupError::Io(_) | DedupError::Csv(_) | DedupError::RowWidth { .. } => EXIT_INPUT,
        DedupError::Persist { .. } => EXIT_PERSIST,
        DedupError::ColumnCompare { .. } => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_DUPLICATES,
            EXIT_CRITICAL,
            EXIT_PERSIST,
            EXIT_INVALID_CONFIG,
            EXIT_INPUT,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_registry() {
        assert_eq!(dedup_exit_code(&DedupError::ConfigParse("x".into())), EXIT_INVALID_CONFIG);
        assert_eq!(dedup_exit_code(&DedupError::Csv("x".into())), EXIT_INPUT);
        assert_eq!(
            dedup_exit_code(&DedupError::RowWidth {
                label: "main".into(),
                row: 0,
                width: 3,
                columns: 2
            }),
            EXIT_INPUT
        );
        assert_eq!(
            dedup_exit_code(&DedupError::Persist {
                label: "main".into(),
                message: "x".into()
            }),
            EXIT_PERSIST
        );
    }
}
