// ABOUTME: Pipeline engine: an ordered list of stages run fail-fast.
// ABOUTME: Stages share a mutable context; the first fatal error halts the run.

mod context;
mod logs;
mod report;
mod result;
pub mod stages;

pub use context::{Mode, PipelineContext};
pub use logs::LogDir;
pub use report::{RunReport, StageReport, next_steps, print_summary};
pub use result::{StageResult, StageStatus};

use crate::error::{Error, Result};
use crate::output::Output;
use async_trait::async_trait;
use std::time::Instant;

/// A single pipeline step.
///
/// `Err` is fatal and halts the run. Advisory misses come back as
/// `StageResult` with `Warn` status and are collected, not fatal.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut PipelineContext) -> Result<StageResult>;
}

/// Ordered stage list, run front to back.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Run every stage in order. The report covers everything that ran,
    /// including the failing stage; stages after a failure never start.
    pub async fn run(
        &self,
        ctx: &mut PipelineContext,
        output: &Output,
    ) -> (RunReport, Result<()>) {
        let mut run_report = RunReport::default();

        for stage in &self.stages {
            let name = stage.name();
            tracing::info!(stage = name, "starting");
            output.progress(&format!("==> {name}"));

            let started = Instant::now();
            match stage.run(ctx).await {
                Ok(result) => {
                    let duration = started.elapsed().as_secs_f64();
                    output.stage(name, result.status.label(), result.detail.as_deref());
                    tracing::info!(
                        stage = name,
                        status = result.status.label(),
                        duration_secs = duration,
                        "finished"
                    );
                    run_report.push(StageReport::from_result(name, &result, duration));
                }
                Err(e) => {
                    let duration = started.elapsed().as_secs_f64();
                    output.stage(name, StageStatus::Fail.label(), Some(&e.to_string()));
                    tracing::error!(stage = name, error = %e, "failed");
                    run_report.push(StageReport::failed(name, e.to_string(), duration));
                    run_report.skipped = self
                        .stages
                        .iter()
                        .skip(run_report.stages.len())
                        .map(|s| s.name())
                        .collect();
                    return (run_report, Err(e));
                }
            }
        }

        (run_report, Ok(()))
    }
}

/// Decide what happens with an advisory check outcome: record a warning or
/// turn it into the given fatal error.
pub fn apply_severity(
    severity: crate::config::Severity,
    ctx: &mut PipelineContext,
    warning: crate::diagnostics::Warning,
    fatal: impl FnOnce(String) -> Error,
) -> Result<StageResult> {
    let message = warning.message.clone();
    match severity {
        crate::config::Severity::Warn => {
            ctx.diagnostics.warn(warning);
            Ok(StageResult::warn(message))
        }
        crate::config::Severity::Fail => Err(fatal(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::output::OutputMode;
    use std::sync::{Arc, Mutex};

    fn test_context(dir: &std::path::Path) -> PipelineContext {
        let config = Config::from_yaml("service: test-app").unwrap();
        let logs = LogDir::create(dir).unwrap();
        PipelineContext::new(Mode::Local, config, dir.to_path_buf(), logs)
    }

    struct ScriptedStage {
        name: &'static str,
        outcome: Mutex<Option<Result<StageResult>>>,
        ran: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ScriptedStage {
        fn boxed(
            name: &'static str,
            outcome: Result<StageResult>,
            ran: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Box<dyn Stage> {
            Box::new(Self {
                name,
                outcome: Mutex::new(Some(outcome)),
                ran: Arc::clone(ran),
            })
        }
    }

    #[async_trait]
    impl Stage for ScriptedStage {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _ctx: &mut PipelineContext) -> Result<StageResult> {
            self.ran.lock().unwrap().push(self.name);
            self.outcome
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(StageResult::ok()))
        }
    }

    #[tokio::test]
    async fn stages_run_in_order_and_failure_halts() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = test_context(tmp.path());
        let output = Output::new(OutputMode::Quiet);
        let ran = Arc::new(Mutex::new(Vec::new()));

        let pipeline = Pipeline::new(vec![
            ScriptedStage::boxed("first", Ok(StageResult::ok()), &ran),
            ScriptedStage::boxed("second", Err(Error::Build("boom".to_string())), &ran),
            ScriptedStage::boxed("third", Ok(StageResult::ok()), &ran),
        ]);
        let (report, result) = pipeline.run(&mut ctx, &output).await;

        assert!(result.is_err());
        assert_eq!(*ran.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.failed_stage().unwrap().name, "second");
        assert_eq!(report.skipped, vec!["third"]);
    }

    #[tokio::test]
    async fn warn_result_does_not_halt() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = test_context(tmp.path());
        let output = Output::new(OutputMode::Quiet);
        let ran = Arc::new(Mutex::new(Vec::new()));

        let pipeline = Pipeline::new(vec![
            ScriptedStage::boxed("advisory", Ok(StageResult::warn("smoke test exited 1")), &ran),
            ScriptedStage::boxed("after", Ok(StageResult::ok()), &ran),
        ]);
        let (report, result) = pipeline.run(&mut ctx, &output).await;

        assert!(result.is_ok());
        assert_eq!(*ran.lock().unwrap(), vec!["advisory", "after"]);
        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.stages[0].status, StageStatus::Warn);
    }

    #[test]
    fn apply_severity_warn_records_and_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = test_context(tmp.path());

        let result = apply_severity(
            crate::config::Severity::Warn,
            &mut ctx,
            crate::diagnostics::Warning::smoke_test("exited 1"),
            Error::Verify,
        )
        .unwrap();

        assert_eq!(result.status, StageStatus::Warn);
        assert!(ctx.diagnostics.has_warnings());
    }

    #[test]
    fn apply_severity_fail_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = test_context(tmp.path());

        let err = apply_severity(
            crate::config::Severity::Fail,
            &mut ctx,
            crate::diagnostics::Warning::smoke_test("exited 1"),
            Error::Verify,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Verify(_)));
        assert!(!ctx.diagnostics.has_warnings());
    }
}
