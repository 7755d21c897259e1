// ABOUTME: Composable capability traits for container engines.
// ABOUTME: Defines RuntimeInfo, ImageOps, and ContainerOps plus their shared types.

mod container;
mod image;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;
