use tracing::{debug, info, warn};

use crate::config::{CommandSpec, NetworkDescriptor, RunRequest};

use super::cli::split_command;
use super::engine::Engine;
use super::error::EngineError;
use super::types::{ContainerHandle, ExecOutput, NetworkOutcome};

/// Make sure a network with the descriptor's subnet and gateway exists.
///
/// An existing network is kept when any of its IPAM pools matches both the
/// subnet and the gateway; otherwise it is removed and recreated. The
/// driver is not compared.
pub fn create_network<E: Engine + ?Sized>(
    engine: &E,
    descriptor: &NetworkDescriptor,
) -> Result<NetworkOutcome, EngineError> {
    info!(
        network = %descriptor.name,
        subnet = %descriptor.subnet,
        gateway = %descriptor.gateway,
        "creating network"
    );

    let existed = match engine.network_inspect(&descriptor.name) {
        Ok(existing) => {
            if existing.has_pool(&descriptor.subnet, &descriptor.gateway) {
                info!(network = %descriptor.name, id = %existing.id, "network already exists");
                return Ok(NetworkOutcome::Unchanged(existing.handle()));
            }
            ignore_not_found(engine.network_remove(&descriptor.name))?;
            info!(network = %descriptor.name, id = %existing.id, "removed network with stale addressing");
            true
        }
        Err(e) if e.is_not_found() => false,
        Err(e) => return Err(e),
    };

    let handle = engine.network_create(descriptor)?;
    Ok(if existed {
        NetworkOutcome::Recreated(handle)
    } else {
        NetworkOutcome::Created(handle)
    })
}

/// Replace any container with the same name by a freshly started one.
pub fn create_container<E: Engine + ?Sized>(
    engine: &E,
    request: &RunRequest,
) -> Result<ContainerHandle, EngineError> {
    info!(
        container = %request.name,
        image = %request.image,
        command = %request.command,
        "creating container"
    );

    match engine.container_remove(&request.name) {
        Ok(()) => info!(container = %request.name, "removed existing container"),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    engine.container_run(request)
}

/// Run one command synchronously inside a container.
///
/// A non-zero exit code is logged and returned, not turned into an error.
pub fn exec_in_container<E: Engine + ?Sized>(
    engine: &E,
    container: &ContainerHandle,
    command: &CommandSpec,
) -> Result<ExecOutput, EngineError> {
    let argv = split_command(&command.cmd)?;
    let out = engine.container_exec(container, &argv, command.workdir.as_deref())?;

    info!(
        container = %container.name,
        cmd = %command.cmd,
        exit_code = ?out.exit_code,
        "ran command"
    );
    if out.success() {
        debug!(container = %container.name, "output:\n{}", out.output);
    } else {
        warn!(container = %container.name, cmd = %command.cmd, "command failed, output:\n{}", out.output);
    }
    Ok(out)
}

fn ignore_not_found(res: Result<(), EngineError>) -> Result<(), EngineError> {
    match res {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
