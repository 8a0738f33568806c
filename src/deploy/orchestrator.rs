use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::{ContainerConfig, GlobalConfig};
use crate::docker::{
    self, ContainerHandle, DEFAULT_BRIDGE, Engine, EngineError, ExecOutput, NetworkHandle,
};

use super::error::DeployError;
use super::types::{CommandResult, DeployReport, ExecReport, NetworkStatus};
use super::workspace;

/// Drives an [`Engine`] through network setup, container creation and
/// command execution for one compose configuration.
///
/// Keeps a handle to the most recently created container so a following
/// [`Deployer::run_commands`] does not have to look it up again.
pub struct Deployer<E: Engine> {
    engine: E,
    global: GlobalConfig,
    hosts_path: PathBuf,
    current: Option<ContainerHandle>,
}

impl<E: Engine> Deployer<E> {
    /// Validate the global configuration and prepare the workspace.
    pub fn new(global: GlobalConfig, engine: E) -> Result<Self, DeployError> {
        let (dir, hosts) = global.validate()?;
        let hosts_path = workspace::prepare(dir, hosts)?;
        Ok(Self {
            engine,
            global,
            hosts_path,
            current: None,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn hosts_path(&self) -> &PathBuf {
        &self.hosts_path
    }

    pub fn current_container(&self) -> Option<&ContainerHandle> {
        self.current.as_ref()
    }

    /// Reconcile every configured network, in declaration order.
    ///
    /// A network that cannot be reconciled is logged and reported; the
    /// remaining ones are still attempted.
    pub fn init_network(&self) -> Vec<NetworkStatus> {
        self.global
            .networks
            .iter()
            .map(|desc| match docker::create_network(&self.engine, desc) {
                Ok(outcome) => NetworkStatus::from_outcome(&desc.name, &outcome),
                Err(e) => {
                    warn!(network = %desc.name, error = %e, "failed to reconcile network");
                    NetworkStatus::failed(&desc.name, e.to_string())
                }
            })
            .collect()
    }

    /// (Re)create a container and attach it to its configured networks.
    pub fn create_container(
        &mut self,
        config: &ContainerConfig,
    ) -> Result<&ContainerHandle, DeployError> {
        let request = config.run_request()?;
        let name = request.name.clone();

        info!(container = %name, "starting container");
        let handle = docker::create_container(&self.engine, &request)
            .map_err(|source| DeployError::CreateFailed {
                name: name.clone(),
                source,
            })?;
        info!(container = %name, id = %handle.id, "created container");

        self.connect_networks(&handle);

        let strip = config.strip_default_network.unwrap_or_else(|| {
            info!(container = %name, "strip_default_network not set, defaulting to true");
            true
        });
        if strip {
            info!(container = %name, "stripping default bridge");
            if let Err(e) = self.engine.network_disconnect(DEFAULT_BRIDGE, &handle) {
                warn!(container = %name, error = %e, "failed to disconnect default bridge");
            }
        }

        Ok(&*self.current.insert(handle))
    }

    fn connect_networks(&self, handle: &ContainerHandle) {
        for desc in &self.global.networks {
            let Some(ipv4) = desc.address_of(&handle.name) else {
                continue;
            };
            match self.connect_one(&desc.name, handle, ipv4) {
                Ok(Some(net)) => info!(
                    network = %net.name,
                    container = %handle.name,
                    ipv4,
                    "connected network"
                ),
                Ok(None) => info!(
                    network = %desc.name,
                    container = %handle.name,
                    "network already connected"
                ),
                Err(e) => warn!(
                    network = %desc.name,
                    container = %handle.name,
                    error = %e,
                    "failed to connect network"
                ),
            }
        }
    }

    fn connect_one(
        &self,
        network: &str,
        handle: &ContainerHandle,
        ipv4: &str,
    ) -> Result<Option<NetworkHandle>, EngineError> {
        let info = self.engine.network_inspect(network)?;
        if info.is_connected(handle) {
            return Ok(None);
        }
        self.engine.network_connect(network, handle, Some(ipv4))?;
        Ok(Some(info.handle()))
    }

    /// Run the container's commands in order.
    ///
    /// Every command runs even if an earlier one fails; the report records
    /// each outcome and the call itself succeeds.
    pub fn run_commands(&self, config: &ContainerConfig) -> Result<ExecReport, DeployError> {
        let name = config.name()?;

        let handle = match &self.current {
            Some(handle) => handle.clone(),
            None => self.engine.container_inspect(name)?,
        };
        if handle.name != name {
            return Err(DeployError::IdentityMismatch {
                expected: name.to_string(),
                actual: handle.name,
            });
        }

        let results = config
            .commands
            .iter()
            .map(|spec| {
                let outcome = docker::exec_in_container(&self.engine, &handle, spec);
                if let Err(e) = &outcome {
                    warn!(container = %name, cmd = %spec.cmd, error = %e, "failed to run command");
                }
                command_result(&spec.cmd, spec.workdir.clone(), outcome)
            })
            .collect();

        let report = ExecReport::new(name, results);
        info!(
            container = %name,
            total = report.summary.total,
            failed = report.summary.failed,
            "finished commands"
        );
        Ok(report)
    }

    /// Reconcile networks, then create each container and run its commands.
    pub fn up(&mut self, containers: &[ContainerConfig]) -> Result<DeployReport, DeployError> {
        let networks = self.init_network();
        let mut reports = Vec::with_capacity(containers.len());
        for config in containers {
            self.create_container(config)?;
            reports.push(self.run_commands(config)?);
        }
        Ok(DeployReport::new(networks, reports))
    }
}

fn command_result(
    cmd: &str,
    workdir: Option<String>,
    outcome: Result<ExecOutput, EngineError>,
) -> CommandResult {
    match outcome {
        Ok(out) => CommandResult {
            cmd: cmd.to_string(),
            workdir,
            exit_code: out.exit_code,
            status: if out.success() { "pass" } else { "fail" }.to_string(),
            log: out.output,
        },
        Err(e) => CommandResult {
            cmd: cmd.to_string(),
            workdir,
            exit_code: None,
            status: "fail".to_string(),
            log: e.to_string(),
        },
    }
}
