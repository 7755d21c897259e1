// ABOUTME: Run report assembly and end-of-run summary printing.

use super::result::{StageResult, StageStatus};
use crate::diagnostics::Diagnostics;
use crate::output::Output;
use std::path::PathBuf;

/// One line of the run report.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub name: &'static str,
    pub status: StageStatus,
    pub detail: Option<String>,
    pub log: Option<PathBuf>,
    pub duration_secs: f64,
}

impl StageReport {
    pub fn from_result(name: &'static str, result: &StageResult, duration_secs: f64) -> Self {
        Self {
            name,
            status: result.status,
            detail: result.detail.clone(),
            log: result.log.clone(),
            duration_secs,
        }
    }

    pub fn failed(name: &'static str, detail: String, duration_secs: f64) -> Self {
        Self {
            name,
            status: StageStatus::Fail,
            detail: Some(detail),
            log: None,
            duration_secs,
        }
    }
}

/// Everything that ran, in order, plus the stages a failure cut off.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
    pub skipped: Vec<&'static str>,
}

impl RunReport {
    pub fn push(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    pub fn failed_stage(&self) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.status == StageStatus::Fail)
    }
}

/// Print the end-of-run summary: warnings first, then the failure (if any)
/// with a pointer at the preserved logs.
pub fn print_summary(output: &Output, report: &RunReport, diagnostics: &Diagnostics) {
    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }

    if let Some(failed) = report.failed_stage() {
        let detail = failed.detail.as_deref().unwrap_or("failed");
        output.error(&format!("{}: {}", failed.name, detail));
        if !report.skipped.is_empty() {
            output.progress(&format!("skipped: {}", report.skipped.join(", ")));
        }
        if let Some(ref log) = failed.log {
            output.progress(&format!("full output: {}", log.display()));
        }
        output.progress("fix the failing stage and re-run `caravel deploy`");
    }
}

/// Command hints printed after a successful cloud deploy.
pub fn next_steps(service: &str, region: &str) -> Vec<String> {
    vec![
        format!("watch logs:  gcloud run services logs read {service} --region {region}"),
        "redeploy:    caravel deploy".to_string(),
        format!(
            "roll back:   gcloud run services update-traffic {service} --region {region} --to-revisions <revision>=100"
        ),
    ]
}
