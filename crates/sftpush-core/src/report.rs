//! Per-step record of one upload run.
//!
//! The orchestrator pushes one [`StepRecord`] per pipeline state into an
//! [`UploadReport`]; the binary logs the summary on exit whether the upload
//! succeeded or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

// ─── Types ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    Pass,
    Fail,
    Info,
    Skip,
}

/// Result of a single pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub message: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub upload_id: String,
    pub host: String,
    pub port: u16,
    pub remote_path: Option<String>,
    pub bytes_written: u64,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    /// Wall-clock milliseconds for the entire run.
    pub total_duration_ms: u64,
    #[serde(skip)]
    epoch: Option<Instant>,
}

// ─── Recording ──────────────────────────────────────────────────────────────

impl UploadReport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            upload_id: Uuid::new_v4().to_string(),
            host: host.into(),
            port,
            remote_path: None,
            bytes_written: 0,
            started_at: Utc::now(),
            steps: Vec::new(),
            total_duration_ms: 0,
            epoch: Some(Instant::now()),
        }
    }

    /// Push a step whose timing started at `started`.
    pub fn record(
        &mut self,
        name: &str,
        status: StepStatus,
        message: impl Into<String>,
        started: Instant,
    ) {
        let message = message.into();
        log::debug!("step '{}' {:?}: {}", name, status, message);
        self.steps.push(StepRecord {
            name: name.to_string(),
            status,
            message,
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    /// Stamp the total duration. Called once when the pipeline exits.
    pub fn finish(&mut self) {
        if let Some(epoch) = self.epoch {
            self.total_duration_ms = epoch.elapsed().as_millis() as u64;
        }
    }

    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status == StepStatus::Fail)
    }

    pub fn succeeded(&self) -> bool {
        !self.steps.is_empty() && self.failed_step().is_none()
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// One-line human summary, e.g. `upload 1f3c… to host:22 succeeded: 5 bytes in 12ms (5 steps)`.
    pub fn summary(&self) -> String {
        match self.failed_step() {
            None => format!(
                "upload {} to {}:{} succeeded: {} bytes in {}ms ({} steps)",
                self.upload_id,
                self.host,
                self.port,
                self.bytes_written,
                self.total_duration_ms,
                self.steps.len()
            ),
            Some(step) => format!(
                "upload {} to {}:{} failed at '{}': {}",
                self.upload_id, self.host, self.port, step.name, step.message
            ),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_has_not_succeeded() {
        let report = UploadReport::new("example.com", 22);
        assert!(!report.succeeded());
        assert!(report.failed_step().is_none());
    }

    #[test]
    fn test_failed_step_drives_summary() {
        let mut report = UploadReport::new("example.com", 2222);
        report.record("connect", StepStatus::Pass, "connected", Instant::now());
        report.record("open-sftp", StepStatus::Fail, "subsystem refused", Instant::now());
        report.finish();

        assert!(!report.succeeded());
        assert_eq!(report.failed_step().map(|s| s.name.as_str()), Some("open-sftp"));
        let summary = report.summary();
        assert!(summary.contains("example.com:2222"));
        assert!(summary.contains("failed at 'open-sftp': subsystem refused"));
    }

    #[test]
    fn test_info_steps_do_not_fail_the_report() {
        let mut report = UploadReport::new("example.com", 22);
        report.record("probe", StepStatus::Info, "not present", Instant::now());
        report.record("write", StepStatus::Pass, "5 bytes", Instant::now());
        report.bytes_written = 5;
        report.finish();

        assert!(report.succeeded());
        assert!(report.summary().contains("succeeded: 5 bytes"));
    }

    #[test]
    fn test_report_serialization() {
        let mut report = UploadReport::new("example.com", 22);
        report.remote_path = Some("/upload/a.txt".into());
        report.record("probe", StepStatus::Info, "not present", Instant::now());

        let json = report.to_json();
        assert!(json.contains("uploadId"));
        assert!(json.contains("remotePath"));
        assert!(json.contains("\"status\":\"info\""));
        assert!(!json.contains("epoch"));
    }
}
