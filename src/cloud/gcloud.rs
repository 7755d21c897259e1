// ABOUTME: gcloud CLI wrapper for managed compute operations.
// ABOUTME: Wraps describe/deploy/auth subcommands with JSON output parsing.

use super::request::DeployRequest;
use super::{CloudError, CloudOps, ServiceDescriptor};
use crate::types::ServiceName;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;

/// gcloud CLI wrapper.
pub struct GcloudCli {
    project: Option<String>,
    region: String,
}

impl GcloudCli {
    pub fn new(project: Option<String>, region: impl Into<String>) -> Self {
        Self {
            project,
            region: region.into(),
        }
    }

    /// Run a gcloud command and return stdout.
    async fn run_command(&self, args: &[&str]) -> Result<String, CloudError> {
        let mut cmd = Command::new("gcloud");
        cmd.args(args);
        if let Some(ref project) = self.project {
            cmd.arg("--project").arg(project);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CloudError::CliNotFound("gcloud".to_string())
            } else {
                CloudError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CloudError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Whether a failed `describe` stderr means the service does not exist.
///
/// The CLI has used several phrasings across releases; a first deploy hits
/// `Cannot find service [name]`.
fn service_absent(stderr: &str) -> bool {
    stderr.contains("NOT_FOUND")
        || stderr.contains("could not be found")
        || stderr.contains("Cannot find service")
}

/// `gcloud auth list` entry.
#[derive(Debug, Deserialize)]
struct AuthAccount {
    account: String,
    status: Option<String>,
}

/// Fields of `run services describe --format json` the pipeline reads.
#[derive(Debug, Deserialize)]
struct DescribeResponse {
    #[serde(default)]
    status: Option<DescribeStatus>,
    #[serde(default)]
    spec: Option<DescribeSpec>,
}

#[derive(Debug, Deserialize)]
struct DescribeStatus {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeSpec {
    template: Option<DescribeTemplate>,
}

#[derive(Debug, Deserialize)]
struct DescribeTemplate {
    spec: Option<DescribeTemplateSpec>,
}

#[derive(Debug, Deserialize)]
struct DescribeTemplateSpec {
    #[serde(default)]
    containers: Vec<DescribeContainer>,
}

#[derive(Debug, Deserialize)]
struct DescribeContainer {
    resources: Option<DescribeResources>,
}

#[derive(Debug, Deserialize)]
struct DescribeResources {
    limits: Option<std::collections::HashMap<String, String>>,
}

impl DescribeResponse {
    fn into_descriptor(self, name: &ServiceName) -> ServiceDescriptor {
        let url = self.status.and_then(|s| s.url);
        let limits = self
            .spec
            .and_then(|s| s.template)
            .and_then(|t| t.spec)
            .and_then(|s| s.containers.into_iter().next())
            .and_then(|c| c.resources)
            .and_then(|r| r.limits);

        let (memory, cpu) = match limits {
            Some(map) => (map.get("memory").cloned(), map.get("cpu").cloned()),
            None => (None, None),
        };

        ServiceDescriptor {
            name: name.to_string(),
            url,
            memory,
            cpu,
        }
    }
}

#[async_trait]
impl CloudOps for GcloudCli {
    async fn verify_install(&self) -> Result<String, CloudError> {
        let output = self.run_command(&["version", "--format", "json"]).await?;
        let versions: std::collections::HashMap<String, serde_json::Value> =
            serde_json::from_str(&output)
                .map_err(|e| CloudError::UnexpectedOutput(e.to_string()))?;

        Ok(versions
            .get("Google Cloud SDK")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string())
    }

    async fn active_account(&self) -> Result<Option<String>, CloudError> {
        let output = self
            .run_command(&["auth", "list", "--format", "json"])
            .await?;

        let accounts: Vec<AuthAccount> = serde_json::from_str(&output)
            .map_err(|e| CloudError::UnexpectedOutput(e.to_string()))?;

        Ok(accounts
            .into_iter()
            .find(|a| a.status.as_deref() == Some("ACTIVE"))
            .map(|a| a.account))
    }

    async fn resolve_project(&self) -> Result<Option<String>, CloudError> {
        if let Some(ref project) = self.project {
            return Ok(Some(project.clone()));
        }

        let output = self
            .run_command(&["config", "get-value", "project"])
            .await?;

        let project = output.trim();
        if project.is_empty() || project == "(unset)" {
            Ok(None)
        } else {
            Ok(Some(project.to_string()))
        }
    }

    async fn configure_docker(&self, registry: &str) -> Result<(), CloudError> {
        self.run_command(&["auth", "configure-docker", registry, "--quiet"])
            .await?;
        Ok(())
    }

    async fn describe_service(
        &self,
        name: &ServiceName,
    ) -> Result<Option<ServiceDescriptor>, CloudError> {
        let result = self
            .run_command(&[
                "run",
                "services",
                "describe",
                name.as_str(),
                "--region",
                &self.region,
                "--platform",
                "managed",
                "--format",
                "json",
            ])
            .await;

        match result {
            Ok(output) => {
                let response: DescribeResponse = serde_json::from_str(&output)
                    .map_err(|e| CloudError::UnexpectedOutput(e.to_string()))?;
                Ok(Some(response.into_descriptor(name)))
            }
            // "not found" is the clean absent case; everything else is real.
            Err(CloudError::CommandFailed(stderr)) if service_absent(&stderr) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn deploy_service(&self, request: &DeployRequest) -> Result<(), CloudError> {
        // Env values may carry secrets; log the redacted form only.
        tracing::debug!(
            "running: gcloud {}",
            request.to_redacted_args().join(" ")
        );

        let args = request.to_args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_command(&arg_refs).await?;
        Ok(())
    }
}
