use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::{NetworkDescriptor, RunRequest};

use super::engine::Engine;
use super::error::{EngineError, looks_not_found};
use super::run::run_streaming;
use super::types::{
    ContainerHandle, ExecOutput, IpamPool, NetworkHandle, NetworkInfo, NetworkMember,
    ResourceKind,
};

pub const DEFAULT_PROGRAM: &str = "docker";

/// [`Engine`] backed by the `docker` command-line client (or anything
/// CLI-compatible with it, such as `podman`).
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    exec_timeout: Option<Duration>,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            exec_timeout: None,
        }
    }

    pub fn with_exec_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.exec_timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Verify that the engine daemon is reachable.
    pub fn ensure_available(&self) -> Result<(), EngineError> {
        let output = Command::new(&self.program)
            .args(["version", "--format", "{{.Server.Version}}"])
            .stdin(Stdio::null())
            .output()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineError::Unavailable(if stderr.is_empty() {
                format!("exit {}", output.status)
            } else {
                stderr
            }));
        }
        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "engine available"
        );
        Ok(())
    }

    /// Run a client subcommand and return its trimmed stdout.
    ///
    /// With a `target`, a failure whose message says the object does not
    /// exist becomes [`EngineError::NotFound`].
    fn call(
        &self,
        args: &[String],
        target: Option<(ResourceKind, &str)>,
    ) -> Result<String, EngineError> {
        debug!(program = %self.program, args = ?args, "engine call");
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if let Some((kind, name)) = target
            && looks_not_found(&stderr, kind)
        {
            return Err(EngineError::NotFound {
                kind,
                name: name.to_string(),
            });
        }
        Err(EngineError::Command {
            command: self.command_line(args),
            code: output.status.code(),
            stderr,
        })
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }
}

impl Engine for DockerCli {
    fn network_inspect(&self, name: &str) -> Result<NetworkInfo, EngineError> {
        let args = strings(["network", "inspect", name]);
        let raw = self.call(&args, Some((ResourceKind::Network, name)))?;
        parse_network(&raw, name).map_err(|source| EngineError::Parse {
            command: self.command_line(&args),
            source,
        })?
    }

    fn network_create(&self, descriptor: &NetworkDescriptor) -> Result<NetworkHandle, EngineError> {
        let id = self.call(&network_create_args(descriptor), None)?;
        Ok(NetworkHandle {
            id,
            name: descriptor.name.clone(),
        })
    }

    fn network_remove(&self, name: &str) -> Result<(), EngineError> {
        self.call(
            &strings(["network", "rm", name]),
            Some((ResourceKind::Network, name)),
        )
        .map(drop)
    }

    fn network_connect(
        &self,
        network: &str,
        container: &ContainerHandle,
        ipv4: Option<&str>,
    ) -> Result<(), EngineError> {
        self.call(
            &network_connect_args(network, &container.id, ipv4),
            Some((ResourceKind::Network, network)),
        )
        .map(drop)
    }

    fn network_disconnect(
        &self,
        network: &str,
        container: &ContainerHandle,
    ) -> Result<(), EngineError> {
        self.call(
            &strings(["network", "disconnect", network, container.id.as_str()]),
            Some((ResourceKind::Network, network)),
        )
        .map(drop)
    }

    fn container_inspect(&self, name: &str) -> Result<ContainerHandle, EngineError> {
        let args = strings(["container", "inspect", name]);
        let raw = self.call(&args, Some((ResourceKind::Container, name)))?;
        parse_container(&raw, name).map_err(|source| EngineError::Parse {
            command: self.command_line(&args),
            source,
        })?
    }

    fn container_remove(&self, name: &str) -> Result<(), EngineError> {
        self.call(
            &strings(["container", "rm", "--force", name]),
            Some((ResourceKind::Container, name)),
        )
        .map(drop)
    }

    fn container_run(&self, request: &RunRequest) -> Result<ContainerHandle, EngineError> {
        let id = self.call(&run_args(request)?, None)?;
        Ok(ContainerHandle {
            id,
            name: request.name.clone(),
        })
    }

    fn container_exec(
        &self,
        container: &ContainerHandle,
        argv: &[String],
        workdir: Option<&str>,
    ) -> Result<ExecOutput, EngineError> {
        let args = exec_args(&container.id, argv, workdir);
        debug!(program = %self.program, args = ?args, "engine exec");
        run_streaming(&self.program, &args, self.exec_timeout)
    }
}

fn strings<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

/// Split a shell-style command line into argv.
pub fn split_command(cmd: &str) -> Result<Vec<String>, EngineError> {
    let argv = shell_words::split(cmd).map_err(|source| EngineError::InvalidCommand {
        cmd: cmd.to_string(),
        source,
    })?;
    if argv.is_empty() {
        return Err(EngineError::EmptyCommand);
    }
    Ok(argv)
}

/// Build `network create` arguments for a descriptor.
pub fn network_create_args(descriptor: &NetworkDescriptor) -> Vec<String> {
    strings([
        "network",
        "create",
        "--driver",
        descriptor.driver.as_str(),
        "--subnet",
        descriptor.subnet.as_str(),
        "--gateway",
        descriptor.gateway.as_str(),
        descriptor.name.as_str(),
    ])
}

pub fn network_connect_args(network: &str, container: &str, ipv4: Option<&str>) -> Vec<String> {
    let mut args = strings(["network", "connect"]);
    if let Some(ip) = ipv4 {
        args.extend(strings(["--ip", ip]));
    }
    args.extend(strings([network, container]));
    args
}

/// Build `run -d` arguments for a resolved container request.
pub fn run_args(request: &RunRequest) -> Result<Vec<String>, EngineError> {
    let mut args = strings([
        "run",
        "--detach",
        "--name",
        request.name.as_str(),
        "--hostname",
        request.hostname.as_str(),
    ]);
    for cap in &request.cap_add {
        args.extend(strings(["--cap-add", cap.as_str()]));
    }
    for var in &request.env {
        args.extend(strings(["--env", var.as_str()]));
    }
    for (host, volume) in &request.volumes {
        args.push("--volume".into());
        args.push(format!("{host}:{}:{}", volume.bind, volume.mode));
    }
    args.push(request.image.clone());
    if !request.command.trim().is_empty() {
        args.extend(split_command(&request.command)?);
    }
    Ok(args)
}

pub fn exec_args(container: &str, argv: &[String], workdir: Option<&str>) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if let Some(dir) = workdir {
        args.extend(strings(["--workdir", dir]));
    }
    args.push(container.to_string());
    args.extend(argv.iter().cloned());
    args
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawNetwork {
    id: String,
    name: String,
    #[serde(default)]
    driver: String,
    #[serde(rename = "IPAM", default)]
    ipam: RawIpam,
    #[serde(default)]
    containers: Option<HashMap<String, RawEndpoint>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct RawIpam {
    #[serde(default)]
    config: Option<Vec<RawPool>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPool {
    #[serde(default)]
    subnet: Option<String>,
    #[serde(default)]
    gateway: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEndpoint {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawContainer {
    id: String,
    name: String,
}

/// Parse `network inspect` output. An empty array means the network is gone.
fn parse_network(
    raw: &str,
    name: &str,
) -> Result<Result<NetworkInfo, EngineError>, serde_json::Error> {
    let mut nets: Vec<RawNetwork> = serde_json::from_str(raw)?;
    if nets.is_empty() {
        return Ok(Err(EngineError::NotFound {
            kind: ResourceKind::Network,
            name: name.to_string(),
        }));
    }
    let net = nets.swap_remove(0);
    Ok(Ok(NetworkInfo {
        id: net.id,
        name: net.name,
        driver: net.driver,
        ipam: net
            .ipam
            .config
            .unwrap_or_default()
            .into_iter()
            .map(|p| IpamPool {
                subnet: p.subnet,
                gateway: p.gateway,
            })
            .collect(),
        members: net
            .containers
            .unwrap_or_default()
            .into_iter()
            .map(|(id, ep)| NetworkMember { id, name: ep.name })
            .collect(),
    }))
}

/// Parse `container inspect` output. An empty array means the container is gone.
fn parse_container(
    raw: &str,
    name: &str,
) -> Result<Result<ContainerHandle, EngineError>, serde_json::Error> {
    let mut containers: Vec<RawContainer> = serde_json::from_str(raw)?;
    if containers.is_empty() {
        return Ok(Err(EngineError::NotFound {
            kind: ResourceKind::Container,
            name: name.to_string(),
        }));
    }
    let c = containers.swap_remove(0);
    Ok(Ok(ContainerHandle {
        id: c.id,
        name: c.name.trim_start_matches('/').to_string(),
    }))
}
