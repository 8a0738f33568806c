//! In-memory engine used by unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use crate::config::{NetworkDescriptor, RunRequest};

use super::engine::Engine;
use super::error::EngineError;
use super::types::{
    ContainerHandle, DEFAULT_BRIDGE, ExecOutput, IpamPool, NetworkHandle, NetworkInfo,
    NetworkMember, ResourceKind,
};

#[derive(Default)]
struct State {
    next_id: u64,
    networks: BTreeMap<String, NetworkInfo>,
    containers: BTreeMap<String, ContainerHandle>,
    addresses: HashMap<(String, String), String>,
    exit_codes: HashMap<String, i32>,
    failing_execs: Vec<String>,
    fail_run: bool,
    fail_connect: Vec<String>,
    calls: Vec<String>,
}

impl State {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }
}

pub(crate) struct FakeEngine {
    state: RefCell<State>,
}

impl FakeEngine {
    /// An engine holding only the default `bridge` network.
    pub fn new() -> Self {
        let engine = Self {
            state: RefCell::new(State::default()),
        };
        {
            let mut s = engine.state.borrow_mut();
            let id = s.fresh_id("net");
            s.networks.insert(
                DEFAULT_BRIDGE.into(),
                NetworkInfo {
                    id,
                    name: DEFAULT_BRIDGE.into(),
                    driver: "bridge".into(),
                    ipam: vec![IpamPool {
                        subnet: Some("172.17.0.0/16".into()),
                        gateway: Some("172.17.0.1".into()),
                    }],
                    members: Vec::new(),
                },
            );
        }
        engine
    }

    /// Make `cmd` (the argv joined by spaces) exit with `code`.
    pub fn with_exit_code(self, cmd: &str, code: i32) -> Self {
        self.state.borrow_mut().exit_codes.insert(cmd.into(), code);
        self
    }

    /// Make exec of `cmd` fail at the engine level.
    pub fn with_failing_exec(self, cmd: &str) -> Self {
        self.state.borrow_mut().failing_execs.push(cmd.into());
        self
    }

    pub fn with_failing_run(self) -> Self {
        self.state.borrow_mut().fail_run = true;
        self
    }

    pub fn with_failing_connect(self, network: &str) -> Self {
        self.state.borrow_mut().fail_connect.push(network.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn network(&self, name: &str) -> Option<NetworkInfo> {
        self.state.borrow().networks.get(name).cloned()
    }

    pub fn container(&self, name: &str) -> Option<ContainerHandle> {
        self.state.borrow().containers.get(name).cloned()
    }

    pub fn address(&self, network: &str, container: &str) -> Option<String> {
        self.state
            .borrow()
            .addresses
            .get(&(network.to_string(), container.to_string()))
            .cloned()
    }

    /// Create a network directly, bypassing call recording.
    pub fn seed_network(&self, name: &str, subnet: &str, gateway: &str) -> NetworkHandle {
        let mut s = self.state.borrow_mut();
        let id = s.fresh_id("net");
        s.networks.insert(
            name.into(),
            NetworkInfo {
                id: id.clone(),
                name: name.into(),
                driver: "bridge".into(),
                ipam: vec![IpamPool {
                    subnet: Some(subnet.into()),
                    gateway: Some(gateway.into()),
                }],
                members: Vec::new(),
            },
        );
        NetworkHandle {
            id,
            name: name.into(),
        }
    }

    /// Start a container directly, bypassing call recording.
    pub fn seed_container(&self, name: &str) -> ContainerHandle {
        let mut s = self.state.borrow_mut();
        let id = s.fresh_id("ctr");
        let handle = ContainerHandle {
            id,
            name: name.into(),
        };
        s.containers.insert(name.into(), handle.clone());
        handle
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Engine for FakeEngine {
    fn network_inspect(&self, name: &str) -> Result<NetworkInfo, EngineError> {
        self.record(format!("network inspect {name}"));
        self.network(name).ok_or(EngineError::NotFound {
            kind: ResourceKind::Network,
            name: name.into(),
        })
    }

    fn network_create(&self, descriptor: &NetworkDescriptor) -> Result<NetworkHandle, EngineError> {
        self.record(format!("network create {}", descriptor.name));
        let mut s = self.state.borrow_mut();
        if s.networks.contains_key(&descriptor.name) {
            return Err(EngineError::Command {
                command: format!("network create {}", descriptor.name),
                code: Some(1),
                stderr: format!("network with name {} already exists", descriptor.name),
            });
        }
        let id = s.fresh_id("net");
        s.networks.insert(
            descriptor.name.clone(),
            NetworkInfo {
                id: id.clone(),
                name: descriptor.name.clone(),
                driver: descriptor.driver.clone(),
                ipam: vec![IpamPool {
                    subnet: Some(descriptor.subnet.clone()),
                    gateway: Some(descriptor.gateway.clone()),
                }],
                members: Vec::new(),
            },
        );
        Ok(NetworkHandle {
            id,
            name: descriptor.name.clone(),
        })
    }

    fn network_remove(&self, name: &str) -> Result<(), EngineError> {
        self.record(format!("network rm {name}"));
        self.state
            .borrow_mut()
            .networks
            .remove(name)
            .map(drop)
            .ok_or(EngineError::NotFound {
                kind: ResourceKind::Network,
                name: name.into(),
            })
    }

    fn network_connect(
        &self,
        network: &str,
        container: &ContainerHandle,
        ipv4: Option<&str>,
    ) -> Result<(), EngineError> {
        self.record(format!("network connect {network} {}", container.name));
        let mut s = self.state.borrow_mut();
        if s.fail_connect.iter().any(|n| n == network) {
            return Err(EngineError::Command {
                command: format!("network connect {network}"),
                code: Some(1),
                stderr: "Address already in use".into(),
            });
        }
        let net = s.networks.get_mut(network).ok_or(EngineError::NotFound {
            kind: ResourceKind::Network,
            name: network.into(),
        })?;
        net.members.push(NetworkMember {
            id: container.id.clone(),
            name: container.name.clone(),
        });
        if let Some(ip) = ipv4 {
            s.addresses
                .insert((network.into(), container.name.clone()), ip.into());
        }
        Ok(())
    }

    fn network_disconnect(
        &self,
        network: &str,
        container: &ContainerHandle,
    ) -> Result<(), EngineError> {
        self.record(format!("network disconnect {network} {}", container.name));
        let mut s = self.state.borrow_mut();
        let net = s.networks.get_mut(network).ok_or(EngineError::NotFound {
            kind: ResourceKind::Network,
            name: network.into(),
        })?;
        net.members.retain(|m| m.id != container.id);
        Ok(())
    }

    fn container_inspect(&self, name: &str) -> Result<ContainerHandle, EngineError> {
        self.record(format!("container inspect {name}"));
        self.container(name).ok_or(EngineError::NotFound {
            kind: ResourceKind::Container,
            name: name.into(),
        })
    }

    fn container_remove(&self, name: &str) -> Result<(), EngineError> {
        self.record(format!("container rm {name}"));
        let mut s = self.state.borrow_mut();
        let removed = s.containers.remove(name).ok_or(EngineError::NotFound {
            kind: ResourceKind::Container,
            name: name.into(),
        })?;
        for net in s.networks.values_mut() {
            net.members.retain(|m| m.id != removed.id);
        }
        Ok(())
    }

    fn container_run(&self, request: &RunRequest) -> Result<ContainerHandle, EngineError> {
        self.record(format!("run {}", request.name));
        let mut s = self.state.borrow_mut();
        if s.fail_run {
            return Err(EngineError::Command {
                command: format!("run {}", request.name),
                code: Some(125),
                stderr: format!("Unable to find image '{}' locally", request.image),
            });
        }
        if s.containers.contains_key(&request.name) {
            return Err(EngineError::Command {
                command: format!("run {}", request.name),
                code: Some(125),
                stderr: format!("Conflict. The container name \"/{}\" is already in use", request.name),
            });
        }
        let id = s.fresh_id("ctr");
        let handle = ContainerHandle {
            id,
            name: request.name.clone(),
        };
        s.containers.insert(request.name.clone(), handle.clone());
        if let Some(bridge) = s.networks.get_mut(DEFAULT_BRIDGE) {
            bridge.members.push(NetworkMember {
                id: handle.id.clone(),
                name: handle.name.clone(),
            });
        }
        Ok(handle)
    }

    fn container_exec(
        &self,
        container: &ContainerHandle,
        argv: &[String],
        _workdir: Option<&str>,
    ) -> Result<ExecOutput, EngineError> {
        let cmd = argv.join(" ");
        self.record(format!("exec {} {cmd}", container.name));
        let s = self.state.borrow();
        if s.failing_execs.contains(&cmd) {
            return Err(EngineError::Command {
                command: format!("exec {cmd}"),
                code: Some(126),
                stderr: "OCI runtime exec failed".into(),
            });
        }
        let exit_code = s.exit_codes.get(&cmd).copied().unwrap_or(0);
        Ok(ExecOutput {
            exit_code: Some(exit_code),
            output: format!("{cmd}\n"),
        })
    }
}
