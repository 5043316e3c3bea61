// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Per-test artifact directory and run summary.
// Purpose: Keep observed alerts and failure reports after a suite finishes.
// Dependencies: system-tests, serde, serde_jcs, tracing
// ============================================================================

//! ## Overview
//! Each system test owns `<run root>/<test name>/`. Passing cases leave the
//! alerts they observed, failing cases leave the full assertion report, and
//! the test ends with `summary.json` (JCS) plus `summary.md`. A reporter that
//! is dropped without [`TestReporter::finish`] still writes the summary.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use alert_harness_core::FiringAlert;
use serde::Serialize;
use system_tests::config::SystemTestConfig;
use tracing::warn;

/// Result of one alert case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    Failed,
}

/// One line of the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct CaseRecord {
    pub name: String,
    pub status: CaseStatus,
    pub observed_alerts: usize,
    /// File next to the summary holding the details.
    pub artifact: Option<String>,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    test: &'a str,
    outcome: &'a str,
    started_at_ms: u128,
    finished_at_ms: u128,
    passed: usize,
    failed: usize,
    cases: &'a [CaseRecord],
    notes: &'a [String],
}

fn unix_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_millis())
}

fn artifact_root() -> io::Result<PathBuf> {
    let config = SystemTestConfig::load().map_err(io::Error::other)?;
    Ok(config.run_root.unwrap_or_else(|| {
        Path::new("target/system-tests").join(format!("run_{}", unix_millis()))
    }))
}

/// Records case outcomes for one system test.
pub struct TestReporter {
    dir: PathBuf,
    test_name: String,
    started_at_ms: u128,
    cases: Vec<CaseRecord>,
    written: bool,
}

impl TestReporter {
    pub fn new(test_name: &str) -> io::Result<Self> {
        let dir = artifact_root()?.join(test_name);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            test_name: test_name.to_string(),
            started_at_ms: unix_millis(),
            cases: Vec::new(),
            written: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keeps the alerts a passing case observed as `<case>.alerts.json`.
    pub fn case_passed(&mut self, case: &str, alerts: &[FiringAlert]) {
        let file = format!("{case}.alerts.json");
        let artifact = match serde_jcs::to_vec(alerts) {
            Ok(bytes) => self.store(file, &bytes),
            Err(err) => {
                warn!(case, error = %err, "observed alerts not serializable");
                None
            }
        };
        self.cases.push(CaseRecord {
            name: case.to_string(),
            status: CaseStatus::Passed,
            observed_alerts: alerts.len(),
            artifact,
        });
    }

    /// Keeps a failing case's report as `<case>.failure.txt`.
    pub fn case_failed(&mut self, case: &str, report: &str) {
        let artifact = self.store(format!("{case}.failure.txt"), report.as_bytes());
        self.cases.push(CaseRecord {
            name: case.to_string(),
            status: CaseStatus::Failed,
            observed_alerts: 0,
            artifact,
        });
    }

    pub fn failures(&self) -> Vec<String> {
        self.cases
            .iter()
            .filter(|record| record.status == CaseStatus::Failed)
            .map(|record| record.name.clone())
            .collect()
    }

    /// Writes `summary.json` and `summary.md`.
    pub fn finish(&mut self, outcome: &str, notes: Vec<String>) -> io::Result<()> {
        let failed = self.failures().len();
        let summary = RunSummary {
            test: &self.test_name,
            outcome,
            started_at_ms: self.started_at_ms,
            finished_at_ms: unix_millis(),
            passed: self.cases.len().saturating_sub(failed),
            failed,
            cases: &self.cases,
            notes: &notes,
        };
        let json = serde_jcs::to_vec(&summary).map_err(io::Error::other)?;
        fs::write(self.dir.join("summary.json"), json)?;
        fs::write(self.dir.join("summary.md"), render_markdown(&summary))?;
        self.written = true;
        Ok(())
    }

    fn store(&self, file: String, bytes: &[u8]) -> Option<String> {
        match fs::write(self.dir.join(&file), bytes) {
            Ok(()) => Some(file),
            Err(err) => {
                warn!(file = %file, error = %err, "artifact write failed");
                None
            }
        }
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.written {
            return;
        }
        let outcome = if std::thread::panicking() { "panicked" } else { "abandoned" };
        let _ = self.finish(outcome, vec!["reporter dropped before finish".to_string()]);
    }
}

fn render_markdown(summary: &RunSummary<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}: {}", summary.test, summary.outcome);
    let _ = writeln!(
        out,
        "\n{} passed, {} failed in {} ms\n",
        summary.passed,
        summary.failed,
        summary.finished_at_ms.saturating_sub(summary.started_at_ms)
    );
    if !summary.cases.is_empty() {
        out.push_str("| Case | Status | Alerts | Artifact |\n|---|---|---|---|\n");
        for record in summary.cases {
            let status = match record.status {
                CaseStatus::Passed => "passed",
                CaseStatus::Failed => "failed",
            };
            let _ = writeln!(
                out,
                "| `{}` | {status} | {} | {} |",
                record.name,
                record.observed_alerts,
                record.artifact.as_deref().unwrap_or("")
            );
        }
    }
    for note in summary.notes {
        let _ = writeln!(out, "\n> {note}");
    }
    out
}
