// ABOUTME: gsutil CLI wrapper for bucket synchronization.

use super::{CloudError, StorageOps};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// gsutil CLI wrapper.
pub struct GsutilCli;

impl GsutilCli {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GsutilCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageOps for GsutilCli {
    async fn sync_dir(&self, source: &str, bucket: &str) -> Result<(), CloudError> {
        let target = if bucket.starts_with("gs://") {
            bucket.to_string()
        } else {
            format!("gs://{bucket}")
        };

        tracing::debug!("running: gsutil -m rsync -r {source} {target}");

        let output = Command::new("gsutil")
            .args(["-m", "rsync", "-r", source, &target])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CloudError::CliNotFound("gsutil".to_string())
                } else {
                    CloudError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CloudError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(())
    }
}
