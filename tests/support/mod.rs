// ABOUTME: Shared test support: an in-memory container engine fake.

use async_trait::async_trait;
use caravel::runtime::{
    ContainerError, ContainerOps, ContainerSpec, ContainerState, ContainerStatus, ImageError,
    ImageOps, RegistryAuth, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use caravel::types::{ContainerId, ImageRef};
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// In-memory engine that records every call. Containers report `Running`
/// once started, so health probes hit whatever the test binds locally.
pub struct FakeRuntime {
    pub calls: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        Ok(RuntimeMetadata {
            name: "fake".to_string(),
            version: "1.0".to_string(),
            api_version: "1.47".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.record("ping".to_string());
        Ok(())
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn build_image(
        &self,
        _context: Vec<u8>,
        reference: &ImageRef,
        log: &mut (dyn Write + Send),
    ) -> Result<(), ImageError> {
        self.record(format!("build {reference}"));
        let _ = writeln!(log, "Successfully built {reference}");
        Ok(())
    }

    async fn tag_image(&self, source: &ImageRef, target: &ImageRef) -> Result<(), ImageError> {
        self.record(format!("tag {source} {target}"));
        Ok(())
    }

    async fn push_image(
        &self,
        reference: &ImageRef,
        _auth: Option<&RegistryAuth>,
        _log: &mut (dyn Write + Send),
    ) -> Result<(), ImageError> {
        self.record(format!("push {reference}"));
        Ok(())
    }

    async fn image_size(&self, _reference: &ImageRef) -> Result<Option<u64>, ImageError> {
        Ok(Some(42 * 1024 * 1024))
    }

    async fn image_exists(&self, _reference: &ImageRef) -> Result<bool, ImageError> {
        Ok(true)
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId, ContainerError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.record(format!("create {}", spec.name));
        Ok(ContainerId::new(format!("fake-{id}")))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.record(format!("start {id}"));
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        self.record(format!("stop {id}"));
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        self.record(format!("remove {id}"));
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerStatus, ContainerError> {
        Ok(ContainerStatus {
            id: id.clone(),
            state: ContainerState::Running,
            exit_code: None,
        })
    }

    async fn container_logs(
        &self,
        _id: &ContainerId,
        _tail: usize,
    ) -> Result<String, ContainerError> {
        Ok(String::new())
    }
}
