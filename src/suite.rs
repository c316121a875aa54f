//! Running every scenario under a directory.
//!
//! A scenario is a `scenario.yaml` with a `responses.yaml` next to it
//! holding the scripted model replies. Each one runs with its own state
//! machine, device and agent; a scenario that fails to load or whose agent
//! aborts is reported as an error entry and the rest still run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use tracing::{error, info};
use walkdir::WalkDir;

use crate::agent::{ActionAgent, CoordinateMode, ScriptedBackend};
use crate::device::MockDeviceConfig;
use crate::error::HarnessResult;
use crate::runner::{TestRunner, Verdict};

pub const SCENARIO_FILE: &str = "scenario.yaml";

pub const RESPONSES_FILE: &str = "responses.yaml";

/// Agent and device settings shared by every scenario in a suite
#[derive(Debug, Clone, Default)]
pub struct SuiteOptions {
    pub coordinates: CoordinateMode,
    pub capture_screenshots: bool,
    pub device: MockDeviceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SuiteOutcome {
    Verdict(Verdict),
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteEntry {
    pub scenario: PathBuf,
    pub outcome: SuiteOutcome,
}

impl SuiteEntry {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, SuiteOutcome::Verdict(v) if v.passed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub generated_at: DateTime<Utc>,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub entries: Vec<SuiteEntry>,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Every `scenario.yaml` below `dir`, sorted by path
pub fn discover(dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == SCENARIO_FILE)
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Run one scenario file with the replies stored beside it
pub fn run_scenario(path: &Path, options: &SuiteOptions) -> HarnessResult<Verdict> {
    let runner = TestRunner::from_path(path)?.device_config(options.device.clone());
    let responses = path.with_file_name(RESPONSES_FILE);
    let backend = ScriptedBackend::from_file(&responses)?;
    let mut agent = ActionAgent::new(backend)
        .coordinates(options.coordinates)
        .capture_screenshots(options.capture_screenshots);
    runner.run(&mut agent)
}

/// Run every scenario under `dir`
pub fn run_suite(dir: impl AsRef<Path>, options: &SuiteOptions) -> SuiteReport {
    let dir = dir.as_ref();
    let scenarios = discover(dir);
    info!(dir = %dir.display(), count = scenarios.len(), "running scenario suite");

    let entries: Vec<SuiteEntry> = scenarios
        .into_iter()
        .map(|path| {
            let outcome = match run_scenario(&path, options) {
                Ok(verdict) => SuiteOutcome::Verdict(verdict),
                Err(e) => {
                    error!(scenario = %path.display(), error = %e, "scenario aborted");
                    SuiteOutcome::Error {
                        message: e.to_string(),
                    }
                }
            };
            SuiteEntry {
                scenario: path,
                outcome,
            }
        })
        .collect();

    let passed = entries.iter().filter(|e| e.passed()).count();
    let errors = entries
        .iter()
        .filter(|e| matches!(e.outcome, SuiteOutcome::Error { .. }))
        .count();

    SuiteReport {
        generated_at: Utc::now(),
        passed,
        failed: entries.len() - passed - errors,
        errors,
        entries,
    }
}
