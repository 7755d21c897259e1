// ABOUTME: Publish stage: tag the local image for the registry and push it.

use crate::cloud::CloudOps;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineContext, Stage, StageResult};
use crate::runtime::{CredentialStore, ImageOps};
use async_trait::async_trait;
use std::sync::Arc;

pub struct PublishStage {
    images: Arc<dyn ImageOps>,
    cloud: Arc<dyn CloudOps>,
    credentials: Arc<CredentialStore>,
}

impl PublishStage {
    pub fn new(
        images: Arc<dyn ImageOps>,
        cloud: Arc<dyn CloudOps>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            images,
            cloud,
            credentials,
        }
    }
}

#[async_trait]
impl Stage for PublishStage {
    fn name(&self) -> &'static str {
        "publish"
    }

    async fn run(&self, ctx: &mut PipelineContext) -> Result<StageResult> {
        let local = ctx
            .local_image
            .clone()
            .ok_or_else(|| Error::Publish("no local image".to_string()))?;
        let remote = ctx
            .remote_image
            .clone()
            .ok_or_else(|| Error::Publish("no registry reference resolved".to_string()))?;

        let present = self
            .images
            .image_exists(&local)
            .await
            .map_err(|e| Error::Publish(e.to_string()))?;
        if !present {
            return Err(Error::Publish(format!("local image not found: {local}")));
        }

        self.images
            .tag_image(&local, &remote)
            .await
            .map_err(|e| Error::Publish(e.to_string()))?;

        // Register the cloud CLI's credential helper before the lookup so a
        // first-time push finds working credentials.
        self.cloud
            .configure_docker(&ctx.config.registry)
            .await
            .map_err(|e| Error::Publish(e.to_string()))?;

        let auth = match self.credentials.lookup(&ctx.config.registry).await {
            Ok(auth) => auth,
            Err(e) => {
                tracing::debug!(error = %e, "credential lookup failed, pushing unauthenticated");
                None
            }
        };

        let (log_path, mut log_file) = ctx.logs.stage_log("publish")?;
        self.images
            .push_image(&remote, auth.as_ref(), &mut log_file)
            .await
            .map_err(|e| Error::Publish(e.to_string()))?;

        Ok(StageResult::ok_with(remote.to_string()).with_log(log_path))
    }
}
