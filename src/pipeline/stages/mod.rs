// ABOUTME: The concrete pipeline stages, in run order.

mod build;
mod deploy;
mod preflight;
mod publish;
mod sync;
mod validate;
mod verify;

pub use build::BuildStage;
pub use deploy::DeployStage;
pub use preflight::PreflightStage;
pub use publish::PublishStage;
pub use sync::SyncStage;
pub use validate::ValidateStage;
pub use verify::VerifyStage;
