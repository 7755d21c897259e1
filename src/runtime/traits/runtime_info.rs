// ABOUTME: Engine liveness and metadata trait.
// ABOUTME: Used by the preflight checks before any mutation happens.

use super::shared_types::RuntimeMetadata;
use async_trait::async_trait;

/// Engine liveness and identity queries.
#[async_trait]
pub trait RuntimeInfo: Send + Sync {
    /// Query engine metadata (name, version, platform).
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;

    /// Liveness query against the engine socket.
    async fn ping(&self) -> Result<(), RuntimeInfoError>;
}

/// Errors from engine info operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("failed to connect to container engine: {0}")]
    ConnectionFailed(String),
}
