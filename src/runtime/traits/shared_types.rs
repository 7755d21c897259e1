// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerSpec, ContainerStatus, PortMapping, RegistryAuth, RuntimeMetadata.

use crate::types::{ContainerId, ImageRef};
use std::collections::HashMap;

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Name for the container.
    pub name: String,
    /// Image to run.
    pub image: ImageRef,
    /// Environment variables.
    pub env: HashMap<String, String>,
    /// Labels to apply.
    pub labels: HashMap<String, String>,
    /// Port mappings (host -> container).
    pub ports: Vec<PortMapping>,
    /// Command to run (overrides image CMD).
    pub command: Option<Vec<String>>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: ImageRef) -> Self {
        Self {
            name: name.into(),
            image,
            env: HashMap::new(),
            labels: HashMap::new(),
            ports: Vec::new(),
            command: None,
        }
    }
}

/// Port mapping configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    /// Host port to bind.
    pub host_port: u16,
    /// Container port.
    pub container_port: u16,
}

/// Point-in-time status of a container.
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    pub id: ContainerId,
    pub state: ContainerState,
    /// Exit code, once the container has stopped.
    pub exit_code: Option<i64>,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

/// Registry authentication credentials.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    /// Username.
    pub username: String,
    /// Password or token.
    pub password: String,
    /// Registry server (e.g., "gcr.io").
    pub server: Option<String>,
}

/// Engine metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Engine name (e.g., "Docker", "Podman").
    pub name: String,
    /// Engine version.
    pub version: String,
    /// API version.
    pub api_version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
}
