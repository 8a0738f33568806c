mod loader;
mod types;

pub use loader::{COMPOSE_FILE_NAMES, discover, load, load_from};
pub use types::{
    BindMode, CommandSpec, ComposeFile, ContainerConfig, DEFAULT_CAPABILITY, DEFAULT_COMMAND,
    DEFAULT_DRIVER, GlobalConfig, NetworkDescriptor, RunRequest, VolumeBind,
};

/// A mandatory configuration field is absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{scope} configuration field <{field}> was not set")]
    MissingField { scope: String, field: &'static str },
}

impl ConfigError {
    pub fn missing(scope: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            scope: scope.into(),
            field,
        }
    }
}
