//! Companion-file discovery for auxiliary series.
//!
//! A main file `prices.csv` may sit next to `prices_M5.csv`, `prices_H1.csv`
//! and so on; each companion becomes an auxiliary dataset labelled by its
//! suffix.

use std::fs;
use std::path::{Path, PathBuf};

use dupguard_dedup::DedupError;

/// Find `<stem>_<LABEL>.csv` files in `dir`, ordered by label.
pub fn discover_auxiliary(dir: &Path, stem: &str) -> Result<Vec<(String, PathBuf)>, DedupError> {
    let prefix = format!("{stem}_");
    let mut found = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            continue;
        }
        let Some(file_stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match file_stem.strip_prefix(&prefix) {
            Some(label) if !label.is_empty() => found.push((label.to_string(), path)),
            _ => {}
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    log::debug!("discovered {} auxiliary file(s) for {stem}", found.len());
    Ok(found)
}
