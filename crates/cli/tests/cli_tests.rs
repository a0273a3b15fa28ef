// End-to-end tests for the `dupguard` binary.
// Run with: cargo test -p dupguard-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn dupguard() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dupguard"));
    cmd.stdin(Stdio::null());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn json_stdout(out: &Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).expect("stdout is JSON")
}

// ============================================================================
// scan
// ============================================================================

#[test]
fn scan_prints_human_summary() {
    let out = dupguard()
        .arg("scan")
        .arg(fixture("eurusd.csv"))
        .arg("--discover")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("main: 22 rows, 2 duplicate(s)"), "{err}");
    assert!(err.contains("skipped (absent or empty): H1"), "{err}");
    assert!(err.contains("overall: 3 duplicate(s) in 33 rows"), "{err}");
    assert!(err.contains("critical: M5: 2 invalid timestamp values in Time"), "{err}");
    assert!(out.stdout.is_empty());
}

#[test]
fn scan_json_report() {
    let out = dupguard()
        .arg("scan")
        .arg(fixture("eurusd.csv"))
        .arg("--aux")
        .arg(format!("M5={}", fixture("eurusd_M5.csv").display()))
        .arg("--json")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let report = json_stdout(&out);
    assert_eq!(report["total_duplicates"], 3);
    assert_eq!(report["total_rows"], 33);
    assert_eq!(report["auxiliary_total"], 1);
    assert_eq!(report["datasets"][0]["label"], "main");
    assert_eq!(report["datasets"][1]["label"], "M5");
    assert_eq!(
        report["critical_issues"][0],
        "M5: 2 invalid timestamp values in Time"
    );
}

#[test]
fn scan_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let out = dupguard()
        .arg("scan")
        .arg(fixture("eurusd.csv"))
        .arg("--output")
        .arg(&path)
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(report["total_duplicates"], 2);
}

#[test]
fn scan_fail_on_duplicates_exits_3() {
    let out = dupguard()
        .arg("scan")
        .arg(fixture("eurusd.csv"))
        .arg("--fail-on-duplicates")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("error: 2 duplicate row(s) found"));
}

#[test]
fn scan_fail_on_critical_exits_4() {
    let out = dupguard()
        .arg("scan")
        .arg(fixture("eurusd.csv"))
        .arg("--discover")
        .arg("--fail-on-critical")
        .arg("--fail-on-duplicates")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn missing_aux_file_is_skipped() {
    let out = dupguard()
        .arg("scan")
        .arg(fixture("eurusd.csv"))
        .arg("--aux")
        .arg("D1=/nonexistent/eurusd_D1.csv")
        .arg("--json")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let report = json_stdout(&out);
    assert_eq!(report["skipped"][0], "D1");
    assert_eq!(report["auxiliary_total"], 1);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn malformed_aux_spec_is_usage_error() {
    let out = dupguard()
        .arg("scan")
        .arg(fixture("eurusd.csv"))
        .arg("--aux")
        .arg("no-equals-sign")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn invalid_config_exits_6() {
    let out = dupguard()
        .arg("scan")
        .arg(fixture("eurusd.csv"))
        .arg("--config")
        .arg(fixture("bad.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(6));
    assert!(stderr(&out).contains("max_key_columns"), "{}", stderr(&out));
}

#[test]
fn unreadable_main_exits_7() {
    let out = dupguard()
        .arg("scan")
        .arg("/nonexistent/main.csv")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(7));
}

#[test]
fn overlong_row_exits_7() {
    let out = dupguard()
        .arg("scan")
        .arg(fixture("broken.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(7));
    assert!(stderr(&out).contains("hint:"));
}

// ============================================================================
// fix
// ============================================================================

#[test]
fn fix_writes_cleaned_files() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let out = dupguard()
        .arg("fix")
        .arg(fixture("eurusd.csv"))
        .arg("--discover")
        .arg("--yes")
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--json")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let outcome = json_stdout(&out);
    assert_eq!(outcome["remediation"]["fixed_count"], 3);
    assert_eq!(outcome["states"][3], "remediating");
    assert_eq!(
        outcome["remediation"]["unresolved_critical_issues"][0],
        "M5: 2 invalid timestamp values in Time"
    );

    let ts = outcome["remediation"]["run_timestamp"].as_str().unwrap();
    let main_out = out_dir.join(format!("cleaned_main_dataset_{ts}.csv"));
    let m5_out = out_dir.join(format!("cleaned_m5_dataset_{ts}.csv"));
    assert_eq!(std::fs::read_to_string(main_out).unwrap().lines().count(), 21);
    assert_eq!(std::fs::read_to_string(m5_out).unwrap().lines().count(), 11);
    assert!(stderr(&out).contains("fixed 3 duplicate row(s) in total"));
}

#[test]
fn fix_without_terminal_proceeds() {
    let dir = tempfile::tempdir().unwrap();
    let out = dupguard()
        .current_dir(dir.path())
        .arg("fix")
        .arg(fixture("eurusd.csv"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let written: Vec<_> = std::fs::read_dir(dir.path().join("cleaned_data"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(written.len(), 1);
    assert!(written[0].starts_with("cleaned_main_dataset_"));
}

#[test]
fn fix_uses_config_output_settings() {
    let dir = tempfile::tempdir().unwrap();
    let out = dupguard()
        .current_dir(dir.path())
        .arg("fix")
        .arg(fixture("eurusd.csv"))
        .arg("--config")
        .arg(fixture("dupguard.toml"))
        .arg("--yes")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let written: Vec<_> = std::fs::read_dir(dir.path().join("cleaned"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].extension().unwrap(), "txt");
}

#[test]
fn fix_persist_failure_exits_5() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let out = dupguard()
        .arg("fix")
        .arg(fixture("eurusd.csv"))
        .arg("--yes")
        .arg("--out-dir")
        .arg(&blocker)
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(5));
    let err = stderr(&out);
    assert!(err.contains("error: could not save: main"), "{err}");
    assert!(err.contains("main: removed 2 rows but not saved"), "{err}");
}

// ============================================================================
// config
// ============================================================================

#[test]
fn config_prints_defaults() {
    let out = dupguard().arg("config").output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("max_key_columns = 3"), "{text}");
    assert!(text.contains("output_dir = \"cleaned_data\""), "{text}");
}

#[test]
fn config_reflects_file() {
    let out = dupguard()
        .arg("config")
        .arg("--config")
        .arg(fixture("dupguard.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("extension = \"txt\""), "{text}");
}
