// ABOUTME: Asset sync stage: mirror a local directory into the bucket
// ABOUTME: the deployed service reads from.

use crate::cloud::StorageOps;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineContext, Stage, StageResult};
use async_trait::async_trait;
use std::sync::Arc;

pub struct SyncStage {
    storage: Arc<dyn StorageOps>,
}

impl SyncStage {
    pub fn new(storage: Arc<dyn StorageOps>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Stage for SyncStage {
    fn name(&self) -> &'static str {
        "sync"
    }

    async fn run(&self, ctx: &mut PipelineContext) -> Result<StageResult> {
        let Some(assets) = ctx.config.assets.clone() else {
            return Ok(StageResult::ok_with("no assets configured"));
        };

        let source = ctx.context_dir.join(&assets.source);
        if !source.is_dir() {
            return Err(Error::Environment(format!(
                "asset source directory missing: {}",
                assets.source
            )));
        }

        // A stale bucket would serve wrong data to the new revision, so
        // sync failures halt the deploy.
        let source_str = source.display().to_string();
        self.storage
            .sync_dir(&source_str, &assets.bucket)
            .await
            .map_err(|e| Error::Publish(format!("asset sync: {e}")))?;

        Ok(StageResult::ok_with(format!(
            "{} -> gs://{}",
            assets.source, assets.bucket
        )))
    }
}
