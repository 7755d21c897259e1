// ABOUTME: Application-wide error types for caravel.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("environment check failed: {0}")]
    Environment(String),

    #[error("build failed: {0}")]
    Build(String),

    #[error("local verification failed: {0}")]
    Verify(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("deploy failed: {0}")]
    Deploy(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Which pipeline failure class this error belongs to, for the summary.
    pub fn class(&self) -> &'static str {
        match self {
            Error::Environment(_)
            | Error::MissingEnvVar(_)
            | Error::ConfigNotFound(_)
            | Error::InvalidConfig(_) => "environment",
            Error::Build(_) => "build",
            Error::Verify(_) => "verify",
            Error::Publish(_) => "publish",
            Error::Deploy(_) => "deploy",
            Error::AlreadyExists(_) | Error::Io(_) | Error::Yaml(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_groups_errors_by_failing_stage() {
        assert_eq!(Error::Environment("no docker".into()).class(), "environment");
        assert_eq!(Error::MissingEnvVar("API_KEY".into()).class(), "environment");
        assert_eq!(Error::Build("step 3 failed".into()).class(), "build");
        assert_eq!(Error::Verify("smoke exited 1".into()).class(), "verify");
        assert_eq!(Error::Publish("denied".into()).class(), "publish");
        assert_eq!(Error::Deploy("quota".into()).class(), "deploy");
        assert_eq!(Error::AlreadyExists("caravel.yml".into()).class(), "io");
    }
}
