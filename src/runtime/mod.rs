// ABOUTME: Container engine abstraction for the local build/verify/publish steps.
// ABOUTME: Capability traits plus the bollard-backed implementation and socket detection.

mod auth;
mod bollard;
mod context;
mod detection;
mod traits;

pub use auth::CredentialStore;
pub use bollard::BollardRuntime;
pub use context::build_context;
pub use detection::{DetectionError, SocketInfo, detect_local};
pub use traits::*;

/// Which engine flavor a socket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "docker"),
            RuntimeType::Podman => write!(f, "podman"),
        }
    }
}
