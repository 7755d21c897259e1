// ABOUTME: Preflight stage: fail before any expensive work can start.
// ABOUTME: Checks files, env vars, the container engine, and cloud auth.

use crate::cloud::CloudOps;
use crate::config::resolve_env_map;
use crate::error::{Error, Result};
use crate::pipeline::{Mode, PipelineContext, Stage, StageResult};
use crate::runtime::RuntimeInfo;
use crate::types::ProjectId;
use async_trait::async_trait;
use std::sync::Arc;

/// First stage. Everything later stages rely on is checked or resolved
/// here: required files, env interpolation, engine reachability, and in
/// cloud mode the deploy CLI, account, and project.
pub struct PreflightStage {
    runtime: Arc<dyn RuntimeInfo>,
    cloud: Option<Arc<dyn CloudOps>>,
}

impl PreflightStage {
    pub fn new(runtime: Arc<dyn RuntimeInfo>, cloud: Option<Arc<dyn CloudOps>>) -> Self {
        Self { runtime, cloud }
    }
}

#[async_trait]
impl Stage for PreflightStage {
    fn name(&self) -> &'static str {
        "preflight"
    }

    async fn run(&self, ctx: &mut PipelineContext) -> Result<StageResult> {
        for file in &ctx.config.required_files {
            let path = ctx.context_dir.join(file);
            if !path.exists() {
                return Err(Error::Environment(format!(
                    "required file missing: {file}"
                )));
            }
        }

        // Resolving here means a missing env var fails before the build.
        ctx.resolved_env = resolve_env_map(&ctx.config.env)?;

        self.runtime
            .ping()
            .await
            .map_err(|e| Error::Environment(e.to_string()))?;
        let meta = self
            .runtime
            .info()
            .await
            .map_err(|e| Error::Environment(e.to_string()))?;
        tracing::debug!(engine = %meta.name, version = %meta.version, "container engine reachable");

        let local = ctx.config.local_image()?;

        let mut detail = format!("{} {}", meta.name, meta.version);

        if ctx.mode == Mode::Cloud {
            let cloud = self
                .cloud
                .as_ref()
                .ok_or_else(|| Error::Environment("no cloud CLI configured".to_string()))?;

            let version = cloud
                .verify_install()
                .await
                .map_err(|e| Error::Environment(e.to_string()))?;
            tracing::debug!(version = %version, "cloud CLI present");

            let account = cloud
                .active_account()
                .await
                .map_err(|e| Error::Environment(e.to_string()))?
                .ok_or_else(|| {
                    Error::Environment("no active cloud account; run the CLI login".to_string())
                })?;

            let project = match ctx.config.project.clone() {
                Some(p) => p,
                None => cloud
                    .resolve_project()
                    .await
                    .map_err(|e| Error::Environment(e.to_string()))?
                    .ok_or_else(|| {
                        Error::Environment(
                            "no project configured and none active in the CLI".to_string(),
                        )
                    })?,
            };

            ctx.remote_image = Some(local.qualified(&ctx.config.registry, &project));
            detail = format!("{detail}, {account} @ {project}");
            ctx.project = Some(ProjectId::new(project));
        }

        ctx.local_image = Some(local);

        Ok(StageResult::ok_with(detail))
    }
}
