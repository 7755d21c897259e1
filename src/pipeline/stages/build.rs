// ABOUTME: Build stage: pack the context and build the local image.

use crate::error::{Error, Result};
use crate::pipeline::{PipelineContext, Stage, StageResult};
use crate::runtime::{ImageOps, build_context};
use async_trait::async_trait;
use std::sync::Arc;

pub struct BuildStage {
    images: Arc<dyn ImageOps>,
}

impl BuildStage {
    pub fn new(images: Arc<dyn ImageOps>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl Stage for BuildStage {
    fn name(&self) -> &'static str {
        "build"
    }

    async fn run(&self, ctx: &mut PipelineContext) -> Result<StageResult> {
        let image = ctx
            .local_image
            .clone()
            .ok_or_else(|| Error::Build("no image reference resolved".to_string()))?;

        let archive = build_context(&ctx.context_dir)?;
        tracing::debug!(bytes = archive.len(), "packed build context");

        let (log_path, mut log_file) = ctx.logs.stage_log("build")?;

        self.images
            .build_image(archive, &image, &mut log_file)
            .await
            .map_err(|e| Error::Build(e.to_string()))?;

        // Size is informational; an inspect hiccup must not fail a good build.
        ctx.image_size = match self.images.image_size(&image).await {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!(error = %e, "image size lookup failed");
                None
            }
        };

        let detail = match ctx.image_size {
            Some(bytes) => format!("{} ({})", image, human_size(bytes)),
            None => format!("{} (size unknown)", image),
        };

        Ok(StageResult::ok_with(detail).with_log(log_path))
    }
}

fn human_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    let mib = bytes as f64 / MIB;
    if mib >= 1024.0 {
        format!("{:.1} GiB", mib / 1024.0)
    } else {
        format!("{:.1} MiB", mib)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ImageError, RegistryAuth};
    use crate::types::ImageRef;
    use std::io::Write;

    struct ScriptedImages {
        build_fails: bool,
        size_fails: bool,
    }

    #[async_trait]
    impl ImageOps for ScriptedImages {
        async fn build_image(
            &self,
            _context: Vec<u8>,
            reference: &ImageRef,
            log: &mut (dyn Write + Send),
        ) -> std::result::Result<(), ImageError> {
            writeln!(log, "Step 1/1 : FROM scratch").map_err(|e| ImageError::Runtime(e.to_string()))?;
            if self.build_fails {
                Err(ImageError::BuildFailed(format!("no such base for {reference}")))
            } else {
                Ok(())
            }
        }

        async fn tag_image(
            &self,
            _source: &ImageRef,
            _target: &ImageRef,
        ) -> std::result::Result<(), ImageError> {
            Ok(())
        }

        async fn push_image(
            &self,
            _reference: &ImageRef,
            _auth: Option<&RegistryAuth>,
            _log: &mut (dyn Write + Send),
        ) -> std::result::Result<(), ImageError> {
            Ok(())
        }

        async fn image_size(
            &self,
            _reference: &ImageRef,
        ) -> std::result::Result<Option<u64>, ImageError> {
            if self.size_fails {
                Err(ImageError::Runtime("inspect failed".to_string()))
            } else {
                Ok(Some(512 * 1024 * 1024))
            }
        }

        async fn image_exists(
            &self,
            _reference: &ImageRef,
        ) -> std::result::Result<bool, ImageError> {
            Ok(true)
        }
    }

    fn context_with_dockerfile(dir: &std::path::Path) -> PipelineContext {
        std::fs::write(dir.join("Dockerfile"), "FROM scratch\n").unwrap();
        let config = crate::config::Config::from_yaml("service: my-app").unwrap();
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

    #[tokio::test]
    async fn failed_build_is_fatal_and_keeps_the_log() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = context_with_dockerfile(tmp.path());

        let stage = BuildStage::new(Arc::new(ScriptedImages {
            build_fails: true,
            size_fails: false,
        }));
        let err = stage.run(&mut ctx).await.unwrap_err();

        assert!(matches!(err, Error::Build(_)));
        let log = std::fs::read_to_string(ctx.logs.path().join("build.log")).unwrap();
        assert!(log.contains("Step 1/1"));
    }

    #[tokio::test]
    async fn size_lookup_failure_does_not_fail_the_build() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = context_with_dockerfile(tmp.path());

        let stage = BuildStage::new(Arc::new(ScriptedImages {
            build_fails: false,
            size_fails: true,
        }));
        let result = stage.run(&mut ctx).await.unwrap();

        assert_eq!(result.status, crate::pipeline::StageStatus::Ok);
        assert!(result.detail.as_deref().unwrap_or("").contains("size unknown"));
        assert_eq!(ctx.image_size, None);
    }

    #[test]
    fn human_size_formats_mib_and_gib() {
        assert_eq!(human_size(512 * 1024 * 1024), "512.0 MiB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }
}
