// ABOUTME: Per-stage outcome type returned by every pipeline stage.

use std::path::PathBuf;

/// How a completed stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// The stage did its work.
    Ok,
    /// The stage finished but an advisory check did not pass.
    Warn,
    /// The stage failed and the run halted.
    Fail,
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Ok => "ok",
            StageStatus::Warn => "warn",
            StageStatus::Fail => "fail",
        }
    }
}

/// Outcome of a single stage run.
///
/// A `Fail` result only ever appears in the run report; stages signal fatal
/// failures by returning `Err`, which halts the pipeline.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub status: StageStatus,
    pub detail: Option<String>,
    /// Log file with the stage's captured output, when one was written.
    pub log: Option<PathBuf>,
}

impl StageResult {
    pub fn ok() -> Self {
        Self {
            status: StageStatus::Ok,
            detail: None,
            log: None,
        }
    }

    pub fn ok_with(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::ok()
        }
    }

    pub fn warn(detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Warn,
            detail: Some(detail.into()),
            log: None,
        }
    }

    pub fn with_log(mut self, log: PathBuf) -> Self {
        self.log = Some(log);
        self
    }
}
