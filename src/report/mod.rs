//! Publish report persistence.
//!
//! The report is the only artifact a run leaves behind: one entry per module with one
//! outcome per repository target. It is written atomically so `status` never reads a
//! half-written file.

use crate::error::{ReportError, Result};
use crate::publish::{PublishResult, Stage, TargetOutcome};
use crate::version::Channel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Current report format version
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// Default report file name, relative to the project root
pub const REPORT_FILE_NAME: &str = ".kodegen_publish_report.json";

/// Outcomes of one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    /// Module artifact id
    pub module: String,
    /// Resolved version, if resolution succeeded
    pub version: Option<String>,
    /// Release channel, if the version was resolved
    pub channel: Option<Channel>,
    /// Whether artifacts were signed
    pub signed: bool,
    /// One outcome per target
    pub results: Vec<TargetOutcome>,
}

impl ModuleReport {
    /// Whether any target failed for this module
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.result.is_failure())
    }

    /// Result for a target by name
    pub fn result_for(&self, target: &str) -> Option<&PublishResult> {
        self.results
            .iter()
            .find(|r| r.target == target)
            .map(|r| &r.result)
    }
}

/// Summary of a publish run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    /// Report format version
    pub format_version: u32,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Per-module outcomes
    pub modules: Vec<ModuleReport>,
}

/// Counts of outcomes across all modules and targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    /// Published outcomes
    pub published: usize,
    /// Skipped outcomes
    pub skipped: usize,
    /// Failed outcomes
    pub failed: usize,
}

impl PublishReport {
    /// Empty report for a run starting now
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            format_version: REPORT_FORMAT_VERSION,
            started_at: now,
            finished_at: now,
            modules: Vec::new(),
        }
    }

    /// Mark the run finished
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Whether every outcome is published or skipped
    pub fn is_success(&self) -> bool {
        !self.modules.iter().any(ModuleReport::has_failures)
    }

    /// Report for a module by artifact id
    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.module == name)
    }

    /// Outcome counts
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for outcome in self.modules.iter().flat_map(|m| &m.results) {
            match outcome.result {
                PublishResult::Published { .. } => counts.published += 1,
                PublishResult::Skipped { .. } => counts.skipped += 1,
                PublishResult::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    /// Stages that failed anywhere in the run
    pub fn failed_stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = Vec::new();
        for stage in self
            .modules
            .iter()
            .flat_map(|m| &m.results)
            .filter_map(|r| r.result.stage())
        {
            if !stages.contains(&stage) {
                stages.push(stage);
            }
        }
        stages
    }

    /// Elapsed wall time
    pub fn elapsed_time(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// One line summary
    pub fn summary(&self) -> String {
        let counts = self.counts();
        format!(
            "{} module(s): {} published, {} skipped, {} failed - {} elapsed",
            self.modules.len(),
            counts.published,
            counts.skipped,
            counts.failed,
            format_duration(self.elapsed_time())
        )
    }

    /// Validate report consistency
    pub fn validate(&self) -> Result<()> {
        if self.format_version != REPORT_FORMAT_VERSION {
            return Err(ReportError::VersionMismatch {
                expected: REPORT_FORMAT_VERSION,
                found: self.format_version,
            }
            .into());
        }
        Ok(())
    }

    /// Write the report atomically (temp file, sync, rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self).map_err(|e| ReportError::SaveFailed {
            reason: format!("Failed to serialize report: {}", e),
        })?;

        let temp_file_path = path.with_extension("tmp");
        {
            let mut file =
                std::fs::File::create(&temp_file_path).map_err(|e| ReportError::SaveFailed {
                    reason: format!("Failed to create temp file: {}", e),
                })?;

            file.write_all(serialized.as_bytes())
                .map_err(|e| ReportError::SaveFailed {
                    reason: format!("Failed to write report: {}", e),
                })?;

            file.sync_all().map_err(|e| ReportError::SaveFailed {
                reason: format!("Failed to sync file: {}", e),
            })?;
        }

        std::fs::rename(&temp_file_path, path).map_err(|e| ReportError::SaveFailed {
            reason: format!("Failed to rename temp file: {}", e),
        })?;

        log::debug!("Saved publish report to {}", path.display());
        Ok(())
    }

    /// Load and validate a saved report
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ReportError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let contents = std::fs::read_to_string(path)?;
        let report: PublishReport = serde_json::from_str(&contents)?;
        report.validate()?;
        Ok(report)
    }
}

impl Default for PublishReport {
    fn default() -> Self {
        Self::new()
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
