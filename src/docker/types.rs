use std::fmt;

use serde::Serialize;

/// Name of the network the engine attaches every new container to.
pub const DEFAULT_BRIDGE: &str = "bridge";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Network,
    Container,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Network => f.write_str("network"),
            ResourceKind::Container => f.write_str("container"),
        }
    }
}

/// Reference to a live engine network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkHandle {
    pub id: String,
    pub name: String,
}

/// Reference to a live engine container. `name` carries no leading `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpamPool {
    pub subnet: Option<String>,
    pub gateway: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkMember {
    pub id: String,
    pub name: String,
}

/// What the engine reports about an existing network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub ipam: Vec<IpamPool>,
    pub members: Vec<NetworkMember>,
}

impl NetworkInfo {
    pub fn handle(&self) -> NetworkHandle {
        NetworkHandle {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// True if any configured pool has exactly this subnet and gateway.
    pub fn has_pool(&self, subnet: &str, gateway: &str) -> bool {
        self.ipam.iter().any(|pool| {
            pool.subnet.as_deref() == Some(subnet) && pool.gateway.as_deref() == Some(gateway)
        })
    }

    pub fn is_connected(&self, container: &ContainerHandle) -> bool {
        self.members
            .iter()
            .any(|m| m.id == container.id || m.name == container.name)
    }
}

/// Result of reconciling one network descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkOutcome {
    /// A network with matching subnet and gateway already existed.
    Unchanged(NetworkHandle),
    Created(NetworkHandle),
    /// The old network had a different subnet or gateway and was replaced.
    Recreated(NetworkHandle),
}

impl NetworkOutcome {
    pub fn handle(&self) -> &NetworkHandle {
        match self {
            NetworkOutcome::Unchanged(h)
            | NetworkOutcome::Created(h)
            | NetworkOutcome::Recreated(h) => h,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkOutcome::Unchanged(_) => "unchanged",
            NetworkOutcome::Created(_) => "created",
            NetworkOutcome::Recreated(_) => "recreated",
        }
    }
}

/// Outcome of a finished `exec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// `None` when the exec client was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Interleaved stdout and stderr.
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
