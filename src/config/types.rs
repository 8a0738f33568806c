use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

pub const DEFAULT_DRIVER: &str = "bridge";
pub const DEFAULT_COMMAND: &str = "/sbin/init";
pub const DEFAULT_CAPABILITY: &str = "SYS_ADMIN";

/// Cluster-wide settings shared by every container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub workspace: Option<PathBuf>,
    pub hosts: Option<String>,
    pub networks: Vec<NetworkDescriptor>,
    /// Seconds before a `docker exec` client is killed. `None` waits forever.
    pub exec_timeout: Option<u64>,
}

impl GlobalConfig {
    /// Check the fields every deployment needs and hand them back borrowed.
    pub fn validate(&self) -> Result<(&PathBuf, &str), ConfigError> {
        let workspace = self
            .workspace
            .as_ref()
            .ok_or_else(|| ConfigError::missing("global", "workspace"))?;
        let hosts = self
            .hosts
            .as_deref()
            .ok_or_else(|| ConfigError::missing("global", "hosts"))?;
        Ok((workspace, hosts))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub name: String,
    pub subnet: String,
    pub gateway: String,
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Container name to the static IPv4 address it gets on this network.
    #[serde(default)]
    pub containers: BTreeMap<String, String>,
}

impl NetworkDescriptor {
    pub fn address_of(&self, container: &str) -> Option<&str> {
        self.containers.get(container).map(String::as_str)
    }
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    Rw,
    Ro,
}

impl BindMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindMode::Rw => "rw",
            BindMode::Ro => "ro",
        }
    }
}

impl fmt::Display for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeBind {
    pub bind: String,
    #[serde(default)]
    pub mode: BindMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub cmd: String,
    #[serde(default)]
    pub workdir: Option<String>,
}

impl CommandSpec {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            workdir: None,
        }
    }
}

/// Per-container settings, as written in the compose file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub image: Option<String>,
    pub command: String,
    pub cap_add: Vec<String>,
    pub env: Vec<String>,
    /// Host path to its bind point inside the container.
    pub volumes: BTreeMap<String, VolumeBind>,
    pub commands: Vec<CommandSpec>,
    pub strip_default_network: Option<bool>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: None,
            hostname: None,
            image: None,
            command: DEFAULT_COMMAND.to_string(),
            cap_add: vec![DEFAULT_CAPABILITY.to_string()],
            env: Vec::new(),
            volumes: BTreeMap::new(),
            commands: Vec::new(),
            strip_default_network: None,
        }
    }
}

impl ContainerConfig {
    pub fn name(&self) -> Result<&str, ConfigError> {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ConfigError::missing("container", "name"))
    }

    /// Resolve defaults into the exact parameters handed to the engine.
    pub fn run_request(&self) -> Result<RunRequest, ConfigError> {
        let name = self.name()?.to_string();
        let image = self
            .image
            .clone()
            .ok_or_else(|| ConfigError::missing(name.clone(), "image"))?;
        Ok(RunRequest {
            hostname: self.hostname.clone().unwrap_or_else(|| name.clone()),
            name,
            image,
            command: self.command.clone(),
            cap_add: self.cap_add.clone(),
            env: self.env.clone(),
            volumes: self.volumes.clone(),
        })
    }
}

/// Fully resolved container creation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub name: String,
    pub hostname: String,
    pub image: String,
    pub command: String,
    pub cap_add: Vec<String>,
    pub env: Vec<String>,
    pub volumes: BTreeMap<String, VolumeBind>,
}

/// On-disk layout of a compose file: global settings plus the containers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeFile {
    #[serde(flatten)]
    pub global: GlobalConfig,
    pub containers: Vec<ContainerConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_names_missing_workspace() {
        let cfg = GlobalConfig {
            hosts: Some("127.0.0.1 localhost".into()),
            ..GlobalConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("workspace"), "{err}");
    }

    #[test]
    fn validate_names_missing_hosts() {
        let cfg = GlobalConfig {
            workspace: Some("/tmp/ws".into()),
            ..GlobalConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("hosts"), "{err}");
    }

    #[test]
    fn container_defaults_follow_init_system_layout() {
        let cfg = ContainerConfig::default();
        assert_eq!(cfg.command, "/sbin/init");
        assert_eq!(cfg.cap_add, vec!["SYS_ADMIN".to_string()]);
        assert!(cfg.strip_default_network.is_none());
    }

    #[test]
    fn blank_name_counts_as_missing() {
        let cfg = ContainerConfig {
            name: Some("  ".into()),
            ..ContainerConfig::default()
        };
        assert!(cfg.name().is_err());
    }

    #[test]
    fn run_request_defaults_hostname_to_name() {
        let cfg = ContainerConfig {
            name: Some("example1".into()),
            image: Some("stk:latest".into()),
            ..ContainerConfig::default()
        };
        let req = cfg.run_request().unwrap();
        assert_eq!(req.hostname, "example1");
        assert_eq!(req.image, "stk:latest");
    }

    #[test]
    fn run_request_requires_image() {
        let cfg = ContainerConfig {
            name: Some("example1".into()),
            ..ContainerConfig::default()
        };
        let err = cfg.run_request().unwrap_err();
        assert!(err.to_string().contains("image"), "{err}");
        assert!(err.to_string().contains("example1"), "{err}");
    }

    #[test]
    fn network_descriptor_driver_defaults_to_bridge() {
        let yaml = "name: stk_mgmt\nsubnet: 10.1.0.0/24\ngateway: 10.1.0.254\n";
        let desc: NetworkDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(desc.driver, "bridge");
        assert!(desc.containers.is_empty());
    }

    #[test]
    fn compose_file_parses_full_layout() {
        let yaml = r#"
workspace: /srv/ws
hosts: |
  127.0.0.1 localhost
networks:
  - name: stk_mgmt
    subnet: 10.1.0.0/24
    gateway: 10.1.0.254
    containers:
      example1: 10.1.0.111
containers:
  - name: example1
    image: stk:latest
    env: [PYTHONPATH=/opt/keystone]
    volumes:
      /srv/ws/etc/hosts:
        bind: /etc/hosts
        mode: ro
    commands:
      - cmd: hostname
        workdir: /root
    strip_default_network: false
"#;
        let file: ComposeFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.global.networks.len(), 1);
        assert_eq!(
            file.global.networks[0].address_of("example1"),
            Some("10.1.0.111")
        );
        let c = &file.containers[0];
        assert_eq!(c.volumes["/srv/ws/etc/hosts"].mode, BindMode::Ro);
        assert_eq!(c.commands[0].workdir.as_deref(), Some("/root"));
        assert_eq!(c.strip_default_network, Some(false));
        assert_eq!(c.command, "/sbin/init");
    }
}
