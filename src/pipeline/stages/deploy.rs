// ABOUTME: Deploy stage: describe the service, then create or update it.
// ABOUTME: Both branches issue the same request; only one-time flags differ.

use crate::cloud::{CloudOps, DeployRequest};
use crate::error::{Error, Result};
use crate::pipeline::{PipelineContext, Stage, StageResult};
use async_trait::async_trait;
use std::sync::Arc;

pub struct DeployStage {
    cloud: Arc<dyn CloudOps>,
}

impl DeployStage {
    pub fn new(cloud: Arc<dyn CloudOps>) -> Self {
        Self { cloud }
    }
}

#[async_trait]
impl Stage for DeployStage {
    fn name(&self) -> &'static str {
        "deploy"
    }

    async fn run(&self, ctx: &mut PipelineContext) -> Result<StageResult> {
        let remote = ctx
            .remote_image
            .clone()
            .ok_or_else(|| Error::Deploy("no registry reference resolved".to_string()))?;

        let existing = self
            .cloud
            .describe_service(&ctx.config.service)
            .await
            .map_err(|e| Error::Deploy(e.to_string()))?;
        let create = existing.is_none();

        let request = DeployRequest {
            service: ctx.config.service.clone(),
            image: remote,
            region: ctx.config.region.clone(),
            memory: ctx.config.resources.memory.clone(),
            cpu: ctx.config.resources.cpu.clone(),
            port: ctx.config.port,
            max_instances: ctx.config.resources.max_instances,
            concurrency: ctx.config.resources.concurrency,
            env: ctx.sorted_env(),
            create,
        };

        self.cloud
            .deploy_service(&request)
            .await
            .map_err(|e| Error::Deploy(e.to_string()))?;

        let deployed = self
            .cloud
            .describe_service(&ctx.config.service)
            .await
            .map_err(|e| Error::Deploy(e.to_string()))?
            .ok_or_else(|| {
                Error::Deploy("service not visible after deploy".to_string())
            })?;

        let url = deployed
            .url
            .ok_or_else(|| Error::Deploy("deployed service has no URL".to_string()))?;

        let verb = if create { "created" } else { "updated" };
        let detail = format!("{verb} {url}");
        ctx.service_url = Some(url);

        Ok(StageResult::ok_with(detail))
    }
}
