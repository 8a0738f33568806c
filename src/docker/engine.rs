use crate::config::{NetworkDescriptor, RunRequest};

use super::error::EngineError;
use super::types::{ContainerHandle, ExecOutput, NetworkHandle, NetworkInfo};

/// Primitive calls against a container engine.
///
/// Lookups and removals of absent objects return [`EngineError::NotFound`];
/// deciding whether that matters is left to the caller.
pub trait Engine {
    fn network_inspect(&self, name: &str) -> Result<NetworkInfo, EngineError>;

    fn network_create(&self, descriptor: &NetworkDescriptor) -> Result<NetworkHandle, EngineError>;

    fn network_remove(&self, name: &str) -> Result<(), EngineError>;

    /// Attach a container, optionally at a fixed IPv4 address.
    fn network_connect(
        &self,
        network: &str,
        container: &ContainerHandle,
        ipv4: Option<&str>,
    ) -> Result<(), EngineError>;

    fn network_disconnect(&self, network: &str, container: &ContainerHandle)
    -> Result<(), EngineError>;

    fn container_inspect(&self, name: &str) -> Result<ContainerHandle, EngineError>;

    /// Force-remove a container, stopping it first if it is running.
    fn container_remove(&self, name: &str) -> Result<(), EngineError>;

    /// Create and start a detached container.
    fn container_run(&self, request: &RunRequest) -> Result<ContainerHandle, EngineError>;

    /// Run `argv` inside a running container and wait for it to finish.
    fn container_exec(
        &self,
        container: &ContainerHandle,
        argv: &[String],
        workdir: Option<&str>,
    ) -> Result<ExecOutput, EngineError>;
}
