// ABOUTME: Image operations trait for container engines.
// ABOUTME: Build, tag, push, and inspect images.

use super::shared_types::RegistryAuth;
use crate::types::ImageRef;
use async_trait::async_trait;
use std::io::Write;

/// Image lifecycle operations.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Build an image from a tar.gz build context, tagging it with
    /// `reference`. Progress lines are written to `log` as they arrive.
    async fn build_image(
        &self,
        context: Vec<u8>,
        reference: &ImageRef,
        log: &mut (dyn Write + Send),
    ) -> Result<(), ImageError>;

    /// Apply an additional tag to an existing local image.
    async fn tag_image(&self, source: &ImageRef, target: &ImageRef) -> Result<(), ImageError>;

    /// Push an image to its registry. Progress lines are written to `log`.
    async fn push_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
        log: &mut (dyn Write + Send),
    ) -> Result<(), ImageError>;

    /// Size of a local image in bytes, if the engine reports one.
    async fn image_size(&self, reference: &ImageRef) -> Result<Option<u64>, ImageError>;

    /// Whether an image exists locally.
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error("push failed: {0}")]
    PushFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
