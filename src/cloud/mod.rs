// ABOUTME: Managed compute and object storage collaborators.
// ABOUTME: CLI-backed implementations behind traits so stages stay testable.

mod gcloud;
mod gsutil;
mod request;

pub use gcloud::GcloudCli;
pub use gsutil::GsutilCli;
pub use request::DeployRequest;

use crate::types::ServiceName;
use async_trait::async_trait;

/// Read-only snapshot of a deployed service, fetched before deciding
/// between create and update. Not cached across runs.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub url: Option<String>,
    pub memory: Option<String>,
    pub cpu: Option<String>,
}

/// Operations against the managed compute target.
#[async_trait]
pub trait CloudOps: Send + Sync {
    /// Verify the CLI is installed and report its version.
    async fn verify_install(&self) -> Result<String, CloudError>;

    /// The active credential principal, if any.
    async fn active_account(&self) -> Result<Option<String>, CloudError>;

    /// Project id from the CLI's active configuration, if set.
    async fn resolve_project(&self) -> Result<Option<String>, CloudError>;

    /// Register the CLI's credential helper for a registry host.
    async fn configure_docker(&self, registry: &str) -> Result<(), CloudError>;

    /// Existence/state query. `Ok(None)` means the service does not exist;
    /// any other failure is an error.
    async fn describe_service(
        &self,
        name: &ServiceName,
    ) -> Result<Option<ServiceDescriptor>, CloudError>;

    /// Issue a deploy call built from `request`. The request itself decides
    /// whether create-only flags are present.
    async fn deploy_service(&self, request: &DeployRequest) -> Result<(), CloudError>;
}

/// Operations against the object storage target.
#[async_trait]
pub trait StorageOps: Send + Sync {
    /// Mirror a local directory into a bucket.
    async fn sync_dir(&self, source: &str, bucket: &str) -> Result<(), CloudError>;
}

/// Errors from cloud CLI invocations.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("cloud CLI not found: {0}")]
    CliNotFound(String),

    #[error("cloud CLI command failed: {0}")]
    CommandFailed(String),

    #[error("unexpected CLI output: {0}")]
    UnexpectedOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
