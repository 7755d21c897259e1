// ABOUTME: Local verification stage: smoke command, start probe, health probe.
// ABOUTME: Container cleanup happens on every path, pass or fail.

use crate::config::Severity;
use crate::diagnostics::{Warning, WarningKind};
use crate::error::{Error, Result};
use crate::pipeline::{PipelineContext, Stage, StageResult, apply_severity};
use crate::probe::HealthProbe;
use crate::runtime::{ContainerOps, ContainerSpec, PortMapping};
use crate::types::{ContainerId, ImageRef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// How often the smoke container is polled for exit.
const SMOKE_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How many polls before the smoke command is considered hung.
const SMOKE_POLL_LIMIT: u32 = 60;
/// Grace period given to `stop` before the engine kills the container.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
/// Log lines captured from a misbehaving container.
const LOG_TAIL: usize = 50;

pub struct VerifyStage {
    containers: Arc<dyn ContainerOps>,
}

impl VerifyStage {
    pub fn new(containers: Arc<dyn ContainerOps>) -> Self {
        Self { containers }
    }

    fn spec(&self, ctx: &PipelineContext, image: &ImageRef, suffix: &str) -> ContainerSpec {
        let mut spec = ContainerSpec::new(
            format!("{}-{}", ctx.config.service.as_str(), suffix),
            image.clone(),
        );
        spec.env = ctx.resolved_env.clone();
        spec.labels = managed_labels();
        spec
    }

    /// Remove a container no matter what state the checks left it in.
    async fn cleanup(&self, id: &ContainerId) {
        if let Err(e) = self.containers.stop_container(id, STOP_TIMEOUT).await {
            tracing::debug!(container = %id, error = %e, "stop during cleanup");
        }
        if let Err(e) = self.containers.remove_container(id, true).await {
            tracing::debug!(container = %id, error = %e, "remove during cleanup");
        }
    }

    /// Run the configured smoke command in a throwaway container and wait
    /// for it to exit. A nonzero exit comes back as an advisory warning.
    async fn smoke_test(
        &self,
        ctx: &PipelineContext,
        image: &ImageRef,
        command: Vec<String>,
        log: &mut (dyn Write + Send),
    ) -> Result<Option<Warning>> {
        let mut spec = self.spec(ctx, image, "smoke");
        spec.command = Some(command);

        let id = self
            .containers
            .create_container(&spec)
            .await
            .map_err(|e| Error::Verify(e.to_string()))?;

        let outcome = self.await_smoke_exit(&id, log).await;
        self.cleanup(&id).await;
        outcome
    }

    async fn await_smoke_exit(
        &self,
        id: &ContainerId,
        log: &mut (dyn Write + Send),
    ) -> Result<Option<Warning>> {
        self.containers
            .start_container(id)
            .await
            .map_err(|e| Error::Verify(e.to_string()))?;

        let mut exit_code = None;
        for _ in 0..SMOKE_POLL_LIMIT {
            let status = self
                .containers
                .inspect_container(id)
                .await
                .map_err(|e| Error::Verify(e.to_string()))?;
            if !status.is_running() {
                exit_code = status.exit_code;
                break;
            }
            tokio::time::sleep(SMOKE_POLL_INTERVAL).await;
        }

        if let Ok(logs) = self.containers.container_logs(id, LOG_TAIL).await {
            let _ = writeln!(log, "--- smoke test output ---");
            let _ = write!(log, "{logs}");
        }

        match exit_code {
            Some(0) => Ok(None),
            Some(code) => Ok(Some(Warning::smoke_test(format!(
                "smoke command exited with code {code}"
            )))),
            None => Ok(Some(Warning::smoke_test(format!(
                "smoke command still running after {SMOKE_POLL_LIMIT}s"
            )))),
        }
    }

    /// Start the service container for real, give it the settle interval,
    /// then check it is still up and answers its health endpoint.
    async fn start_probe(
        &self,
        ctx: &PipelineContext,
        image: &ImageRef,
        log: &mut (dyn Write + Send),
    ) -> Result<Vec<Warning>> {
        let host_port = ctx.config.host_port();
        let mut spec = self.spec(ctx, image, "verify");
        spec.ports = vec![PortMapping {
            host_port,
            container_port: ctx.config.port,
        }];

        let id = self
            .containers
            .create_container(&spec)
            .await
            .map_err(|e| Error::Verify(e.to_string()))?;

        let outcome = self.probe_running_container(ctx, &id, host_port, log).await;
        self.cleanup(&id).await;
        outcome
    }

    async fn probe_running_container(
        &self,
        ctx: &PipelineContext,
        id: &ContainerId,
        host_port: u16,
        log: &mut (dyn Write + Send),
    ) -> Result<Vec<Warning>> {
        self.containers
            .start_container(id)
            .await
            .map_err(|e| Error::Verify(e.to_string()))?;

        tokio::time::sleep(ctx.config.verify.settle).await;

        let status = self
            .containers
            .inspect_container(id)
            .await
            .map_err(|e| Error::Verify(e.to_string()))?;

        if !status.is_running() {
            if let Ok(logs) = self.containers.container_logs(id, LOG_TAIL).await {
                let _ = writeln!(log, "--- container output before exit ---");
                let _ = write!(log, "{logs}");
            }
            let code = status
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Ok(vec![Warning::start_probe(format!(
                "container exited during settle (exit code {code})"
            ))]);
        }

        let probe = HealthProbe::new(ctx.config.health.probe_timeout)
            .map_err(|e| Error::Verify(e.to_string()))?;
        let url = format!("http://127.0.0.1:{host_port}{}", ctx.config.health.path);

        match probe.check(&url).await {
            Ok(()) => Ok(vec![]),
            Err(e) => {
                if let Ok(logs) = self.containers.container_logs(id, LOG_TAIL).await {
                    let _ = writeln!(log, "--- container output after failed probe ---");
                    let _ = write!(log, "{logs}");
                }
                Ok(vec![Warning::health_probe(format!(
                    "local health endpoint: {e}"
                ))])
            }
        }
    }
}

fn managed_labels() -> HashMap<String, String> {
    HashMap::from([(
        "io.caravel.managed".to_string(),
        "true".to_string(),
    )])
}

fn severity_for(ctx: &PipelineContext, kind: WarningKind) -> Severity {
    match kind {
        WarningKind::SmokeTest => ctx.config.severity.smoke_test,
        WarningKind::StartProbe => ctx.config.severity.start_probe,
        WarningKind::HealthProbe => ctx.config.severity.health_probe,
        _ => Severity::Warn,
    }
}

#[async_trait]
impl Stage for VerifyStage {
    fn name(&self) -> &'static str {
        "verify"
    }

    async fn run(&self, ctx: &mut PipelineContext) -> Result<StageResult> {
        let image = ctx
            .local_image
            .clone()
            .ok_or_else(|| Error::Verify("no image built".to_string()))?;

        let (log_path, mut log_file) = ctx.logs.stage_log("verify")?;
        let mut advisories = Vec::new();

        if let Some(command) = ctx.config.verify.smoke_command.clone() {
            advisories.extend(self.smoke_test(ctx, &image, command, &mut log_file).await?);
        }

        advisories.extend(self.start_probe(ctx, &image, &mut log_file).await?);

        let mut warn_details = Vec::new();
        for warning in advisories {
            let severity = severity_for(ctx, warning.kind);
            let result = apply_severity(severity, ctx, warning, Error::Verify)?;
            warn_details.extend(result.detail);
        }

        if warn_details.is_empty() {
            Ok(StageResult::ok_with("container starts and responds").with_log(log_path))
        } else {
            Ok(StageResult::warn(warn_details.join("; ")).with_log(log_path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ContainerError, ContainerState, ContainerStatus};
    use std::sync::Mutex;

    /// Containers whose inspect always reports an immediate exit. Records
    /// every call so cleanup behavior can be asserted.
    struct ExitingContainers {
        exit_code: i64,
        calls: Mutex<Vec<String>>,
    }

    impl ExitingContainers {
        fn new(exit_code: i64) -> Self {
            Self {
                exit_code,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    #[async_trait]
    impl ContainerOps for ExitingContainers {
        async fn create_container(
            &self,
            spec: &ContainerSpec,
        ) -> std::result::Result<ContainerId, ContainerError> {
            self.record(&format!("create {}", spec.name));
            Ok(ContainerId::new("c1"))
        }

        async fn start_container(
            &self,
            _id: &ContainerId,
        ) -> std::result::Result<(), ContainerError> {
            self.record("start");
            Ok(())
        }

        async fn stop_container(
            &self,
            _id: &ContainerId,
            _timeout: Duration,
        ) -> std::result::Result<(), ContainerError> {
            self.record("stop");
            Ok(())
        }

        async fn remove_container(
            &self,
            _id: &ContainerId,
            force: bool,
        ) -> std::result::Result<(), ContainerError> {
            self.record(&format!("remove force={force}"));
            Ok(())
        }

        async fn inspect_container(
            &self,
            _id: &ContainerId,
        ) -> std::result::Result<ContainerStatus, ContainerError> {
            self.record("inspect");
            Ok(ContainerStatus {
                id: ContainerId::new("c1"),
                state: ContainerState::Exited,
                exit_code: Some(self.exit_code),
            })
        }

        async fn container_logs(
            &self,
            _id: &ContainerId,
            _tail: usize,
        ) -> std::result::Result<String, ContainerError> {
            self.record("logs");
            Ok("Traceback: boom\n".to_string())
        }
    }

    fn context_with(dir: &std::path::Path, yaml: &str) -> PipelineContext {
        let config = crate::config::Config::from_yaml(yaml).unwrap();
        let logs = crate::pipeline::LogDir::create(dir).unwrap();
        let mut ctx = PipelineContext::new(
            crate::pipeline::Mode::Local,
            config,
            dir.to_path_buf(),
            logs,
        );
        ctx.local_image = Some(ImageRef::parse("my-app:latest").unwrap());
        ctx
    }

    const FAST_SETTLE: &str = "service: my-app\nverify:\n  settle: 10ms\n";

    #[tokio::test]
    async fn dead_container_warns_and_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = context_with(tmp.path(), FAST_SETTLE);

        let containers = Arc::new(ExitingContainers::new(1));
        let stage = VerifyStage::new(Arc::clone(&containers) as Arc<dyn ContainerOps>);

        let result = stage.run(&mut ctx).await.unwrap();
        assert_eq!(result.status, crate::pipeline::StageStatus::Warn);
        assert!(ctx.diagnostics.has_warnings());

        let calls = containers.calls.lock().unwrap();
        assert!(calls.iter().any(|c| c == "remove force=true"));
        // Container output lands in the stage log for inspection.
        let log = std::fs::read_to_string(result.log.unwrap()).unwrap();
        assert!(log.contains("Traceback: boom"));
    }

    #[tokio::test]
    async fn dead_container_is_fatal_under_fail_severity() {
        let tmp = tempfile::tempdir().unwrap();
        let yaml = format!("{FAST_SETTLE}severity:\n  start_probe: fail\n");
        let mut ctx = context_with(tmp.path(), &yaml);

        let containers = Arc::new(ExitingContainers::new(137));
        let stage = VerifyStage::new(Arc::clone(&containers) as Arc<dyn ContainerOps>);

        let err = stage.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Error::Verify(_)));

        // Cleanup already happened before severity was applied.
        let calls = containers.calls.lock().unwrap();
        assert!(calls.iter().any(|c| c == "remove force=true"));
    }

    #[tokio::test]
    async fn failing_smoke_command_is_advisory_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let yaml = "service: my-app\n\
                    verify:\n  settle: 10ms\n  smoke_command: [\"python\", \"-c\", \"import app\"]\n";
        let mut ctx = context_with(tmp.path(), yaml);

        let containers = Arc::new(ExitingContainers::new(1));
        let stage = VerifyStage::new(Arc::clone(&containers) as Arc<dyn ContainerOps>);

        let result = stage.run(&mut ctx).await.unwrap();
        assert_eq!(result.status, crate::pipeline::StageStatus::Warn);

        // Both the smoke container and the verify container were removed.
        let calls = containers.calls.lock().unwrap();
        let removals = calls.iter().filter(|c| c.starts_with("remove")).count();
        assert_eq!(removals, 2);
    }
}
