// ABOUTME: Bollard-based container engine implementation.
// ABOUTME: Supports both Docker and Podman via the Docker-compatible API.

use super::RuntimeType;
use super::detection::SocketInfo;
use super::traits::{
    ContainerError, ContainerOps, ContainerSpec, ContainerState, ContainerStatus, ImageError,
    ImageOps, RegistryAuth, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::types::{ContainerId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{ContainerCreateBody, HostConfig, PortBinding};
use bollard::query_parameters::{
    BuildImageOptions, CreateContainerOptions, InspectContainerOptions, LogsOptions,
    PushImageOptions, RemoveContainerOptions, StopContainerOptions, TagImageOptions,
};
use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{Either, Full};
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::AlreadyRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::NotRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_image_push_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    ImageError::PushFailed(format!("{}: {}", image_name, e))
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container engine implementation using bollard.
///
/// Supports both Docker and Podman via the Docker-compatible API.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to the engine behind a detected socket.
    ///
    /// Use with `detect_local()`.
    pub fn connect(info: &SocketInfo) -> Result<Self, RuntimeInfoError> {
        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, info.runtime_type))
    }

    /// Get the engine type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker".to_string(),
            RuntimeType::Podman => "Podman".to_string(),
        };

        Ok(RuntimeMetadata {
            name,
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn build_image(
        &self,
        context: Vec<u8>,
        reference: &ImageRef,
        log: &mut (dyn Write + Send),
    ) -> Result<(), ImageError> {
        let image_name = reference.to_string();

        let opts = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: Some(image_name.clone()),
            ..Default::default()
        };

        let body = Either::Left(Full::new(Bytes::from(context)));
        let mut stream = self.client.build_image(opts, None, Some(body));

        // The stream carries both progress lines and in-band errors; every
        // line goes to the log sink so failed builds keep their evidence.
        while let Some(msg) = stream.next().await {
            let info = msg.map_err(|e| {
                let _ = writeln!(log, "ERROR: {}", e);
                ImageError::BuildFailed(format!("{}: {}", image_name, e))
            })?;

            if let Some(line) = info.stream {
                let _ = write!(log, "{}", line);
            }
            if let Some(status) = info.status {
                let _ = writeln!(log, "{}", status);
            }
            if let Some(detail) = info.error_detail {
                let error = detail.message.unwrap_or_default();
                let _ = writeln!(log, "ERROR: {}", error);
                return Err(ImageError::BuildFailed(error));
            }
        }

        Ok(())
    }

    async fn tag_image(&self, source: &ImageRef, target: &ImageRef) -> Result<(), ImageError> {
        let repo = match target.registry() {
            Some(registry) => format!("{}/{}", registry, target.name()),
            None => target.name().to_string(),
        };

        let opts = TagImageOptions {
            repo: Some(repo),
            tag: Some(target.tag().to_string()),
        };

        self.client
            .tag_image(&source.to_string(), Some(opts))
            .await
            .map_err(|e| ImageError::Runtime(format!("failed to tag {}: {}", source, e)))
    }

    async fn push_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
        log: &mut (dyn Write + Send),
    ) -> Result<(), ImageError> {
        let repo = match reference.registry() {
            Some(registry) => format!("{}/{}", registry, reference.name()),
            None => reference.name().to_string(),
        };
        let full_name = reference.to_string();

        let opts = PushImageOptions {
            tag: Some(reference.tag().to_string()),
            ..Default::default()
        };

        let credentials = auth.map(|a| bollard::auth::DockerCredentials {
            username: Some(a.username.clone()),
            password: Some(a.password.clone()),
            serveraddress: a.server.clone(),
            ..Default::default()
        });

        let mut stream = self.client.push_image(&repo, Some(opts), credentials);

        while let Some(result) = stream.next().await {
            let info = result.map_err(|e| {
                let _ = writeln!(log, "ERROR: {}", e);
                map_image_push_error(e, &full_name)
            })?;

            if let Some(status) = info.status {
                let _ = writeln!(log, "{}", status);
            }
            if let Some(detail) = info.error_detail {
                let error = detail.message.unwrap_or_default();
                let _ = writeln!(log, "ERROR: {}", error);
                return Err(ImageError::PushFailed(format!("{}: {}", full_name, error)));
            }
        }

        Ok(())
    }

    async fn image_size(&self, reference: &ImageRef) -> Result<Option<u64>, ImageError> {
        let image_name = reference.to_string();

        let inspect = self
            .client
            .inspect_image(&image_name)
            .await
            .map_err(|e| match &e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => ImageError::NotFound(image_name.clone()),
                _ => ImageError::Runtime(format!("failed to inspect {}: {}", image_name, e)),
            })?;

        Ok(inspect.size.and_then(|s| u64::try_from(s).ok()))
    }

    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        let image_name = reference.to_string();

        match self.client.inspect_image(&image_name).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(ImageError::Runtime(format!(
                "failed to inspect {}: {}",
                image_name, e
            ))),
        }
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId, ContainerError> {
        let image_name = spec.image.to_string();

        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let mut host_config = HostConfig::default();

        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        let mut exposed_ports: Vec<String> = Vec::new();
        for port in &spec.ports {
            let port_key = format!("{}/tcp", port.container_port);
            exposed_ports.push(port_key.clone());
            port_bindings.insert(
                port_key,
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(port.host_port.to_string()),
                }]),
            );
        }
        if !port_bindings.is_empty() {
            host_config.port_bindings = Some(port_bindings);
        }

        let body = ContainerCreateBody {
            image: Some(image_name),
            env: if env.is_empty() { None } else { Some(env) },
            labels: if spec.labels.is_empty() {
                None
            } else {
                Some(spec.labels.clone())
            },
            cmd: spec.command.clone(),
            host_config: Some(host_config),
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(spec.name.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(map_container_create_error)?;

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(
                id.as_str(),
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)?;

        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerStatus, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let state = details.state.as_ref();

        let container_state = state
            .and_then(|s| s.status)
            .map(|s| match s {
                bollard::models::ContainerStateStatusEnum::CREATED => ContainerState::Created,
                bollard::models::ContainerStateStatusEnum::RUNNING => ContainerState::Running,
                bollard::models::ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
                bollard::models::ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
                bollard::models::ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
                bollard::models::ContainerStateStatusEnum::EXITED => ContainerState::Exited,
                bollard::models::ContainerStateStatusEnum::DEAD => ContainerState::Dead,
                _ => ContainerState::Exited,
            })
            .unwrap_or(ContainerState::Exited);

        Ok(ContainerStatus {
            id: id.clone(),
            state: container_state,
            exit_code: state.and_then(|s| s.exit_code),
        })
    }

    async fn container_logs(
        &self,
        id: &ContainerId,
        tail: usize,
    ) -> Result<String, ContainerError> {
        let opts = LogsOptions {
            stdout: true,
            stderr: true,
            follow: false,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut stream = self.client.logs(id.as_str(), Some(opts));
        let mut collected = String::new();

        while let Some(result) = stream.next().await {
            let output = result.map_err(|e| ContainerError::Runtime(e.to_string()))?;
            let data = match output {
                bollard::container::LogOutput::StdOut { message } => message,
                bollard::container::LogOutput::StdErr { message } => message,
                bollard::container::LogOutput::StdIn { message } => message,
                bollard::container::LogOutput::Console { message } => message,
            };
            collected.push_str(&String::from_utf8_lossy(&data));
        }

        Ok(collected)
    }
}
