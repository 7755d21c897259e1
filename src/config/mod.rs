// ABOUTME: Configuration types and parsing for caravel.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and defaults.

mod env_value;
mod init;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;

use crate::error::{Error, Result};
use crate::types::{ImageRef, ServiceName};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "caravel.yml";
pub const CONFIG_FILENAME_ALT: &str = "caravel.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".caravel/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_service_name")]
    pub service: ServiceName,

    /// Image name without tag. Defaults to the service name.
    #[serde(default)]
    pub image: Option<String>,

    /// Image tag, e.g. "latest" or a release channel.
    #[serde(default = "default_channel")]
    pub channel: String,

    #[serde(default = "default_registry")]
    pub registry: String,

    /// Cloud project identifier. Resolved from the deploy CLI's active
    /// configuration when unset (cloud mode only).
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Container port the service listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    #[serde(default)]
    pub resources: ResourcesConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub severity: SeverityConfig,

    #[serde(default)]
    pub assets: Option<AssetsConfig>,

    /// Env var holding an upstream API credential for the optional
    /// post-deploy credentialed probe. Absence of the variable skips it.
    #[serde(default)]
    pub credential_env: Option<String>,

    #[serde(default = "default_required_files")]
    pub required_files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default = "default_memory")]
    pub memory: String,

    #[serde(default = "default_cpu")]
    pub cpu: String,

    #[serde(default = "default_max_instances")]
    pub max_instances: u32,

    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            memory: default_memory(),
            cpu: default_cpu(),
            max_instances: default_max_instances(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_path")]
    pub path: String,

    /// Per-request timeout for health probes.
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// Overall deadline for the post-deploy readiness wait.
    #[serde(default = "default_deadline", with = "humantime_serde")]
    pub deadline: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: default_health_path(),
            probe_timeout: default_probe_timeout(),
            deadline: default_deadline(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyConfig {
    /// Command run inside an ephemeral container as the smoke test.
    #[serde(default)]
    pub smoke_command: Option<Vec<String>>,

    /// How long the started container gets to settle before the
    /// still-running check.
    #[serde(default = "default_settle", with = "humantime_serde")]
    pub settle: Duration,

    /// Host port to bind the container port to. Defaults to the container
    /// port itself.
    #[serde(default)]
    pub host_port: Option<u16>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            smoke_command: None,
            settle: default_settle(),
            host_port: None,
        }
    }
}

/// Outcome class for an advisory check.
///
/// The source pipelines were inconsistent about which smoke failures should
/// halt a deploy; this makes the policy explicit per check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Warn,
    Fail,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SeverityConfig {
    #[serde(default)]
    pub smoke_test: Severity,

    #[serde(default)]
    pub start_probe: Severity,

    #[serde(default)]
    pub health_probe: Severity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// Destination bucket name (no scheme prefix).
    pub bucket: String,

    /// Local directory to sync.
    pub source: String,
}

fn default_channel() -> String {
    "latest".to_string()
}

fn default_registry() -> String {
    "gcr.io".to_string()
}

fn default_region() -> String {
    "us-central1".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_memory() -> String {
    "512Mi".to_string()
}

fn default_cpu() -> String {
    "1".to_string()
}

fn default_max_instances() -> u32 {
    5
}

fn default_concurrency() -> u32 {
    80
}

fn default_health_path() -> String {
    "/_stcore/health".to_string()
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_deadline() -> Duration {
    Duration::from_secs(60)
}

fn default_settle() -> Duration {
    Duration::from_secs(10)
}

fn default_required_files() -> Vec<String> {
    vec!["Dockerfile".to_string()]
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Local image reference: `<image-or-service>:<channel>`.
    pub fn local_image(&self) -> Result<ImageRef> {
        let name = self.image.as_deref().unwrap_or(self.service.as_str());
        let base = ImageRef::parse(name).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(base.with_tag(&self.channel))
    }

    /// Host port for the local start probe.
    pub fn host_port(&self) -> u16 {
        self.verify.host_port.unwrap_or(self.port)
    }

    pub fn template() -> Self {
        Config {
            service: ServiceName::new("my-app").expect("template name is valid"),
            image: None,
            channel: default_channel(),
            registry: default_registry(),
            project: None,
            region: default_region(),
            port: default_port(),
            env: HashMap::new(),
            resources: ResourcesConfig::default(),
            health: HealthConfig::default(),
            verify: VerifyConfig::default(),
            severity: SeverityConfig::default(),
            assets: None,
            credential_env: None,
            required_files: default_required_files(),
        }
    }
}

fn deserialize_service_name<'de, D>(deserializer: D) -> std::result::Result<ServiceName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ServiceName::new(&s).map_err(serde::de::Error::custom)
}
