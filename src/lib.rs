// ABOUTME: Library crate for caravel.
// ABOUTME: Build, verify, and ship container services to managed cloud compute.

pub mod cloud;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod runtime;
pub mod types;
