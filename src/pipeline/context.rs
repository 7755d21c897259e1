// ABOUTME: Shared mutable state threaded through the pipeline stages.

use super::logs::LogDir;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::types::{ImageRef, ProjectId};
use std::collections::HashMap;
use std::path::PathBuf;

/// How far the pipeline goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Build and verify locally, never touch the cloud.
    Local,
    /// The full path: build, verify, publish, deploy, validate.
    Cloud,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Local => write!(f, "local"),
            Mode::Cloud => write!(f, "cloud"),
        }
    }
}

/// State shared across stages. Early stages fill in what later ones read.
pub struct PipelineContext {
    pub mode: Mode,
    pub config: Config,
    /// Directory holding the Dockerfile and build context.
    pub context_dir: PathBuf,
    pub logs: LogDir,
    pub diagnostics: Diagnostics,

    /// Env map with all values resolved. Set by preflight.
    pub resolved_env: HashMap<String, String>,
    /// Local image reference built and verified. Set by preflight.
    pub local_image: Option<ImageRef>,
    /// Fully qualified registry reference. Set by preflight in cloud mode.
    pub remote_image: Option<ImageRef>,
    /// Cloud project id. Set by preflight in cloud mode.
    pub project: Option<ProjectId>,
    /// Size of the built image in bytes, when the engine reports one.
    pub image_size: Option<u64>,
    /// URL of the deployed service. Set by the deploy stage.
    pub service_url: Option<String>,
}

impl PipelineContext {
    pub fn new(mode: Mode, config: Config, context_dir: PathBuf, logs: LogDir) -> Self {
        Self {
            mode,
            config,
            context_dir,
            logs,
            diagnostics: Diagnostics::default(),
            resolved_env: HashMap::new(),
            local_image: None,
            remote_image: None,
            project: None,
            image_size: None,
            service_url: None,
        }
    }

    /// Resolved env as sorted pairs for deterministic CLI args.
    pub fn sorted_env(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .resolved_env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}
