use std::path::PathBuf;

use crate::config::ConfigError;
use crate::docker::EngineError;

/// Conditions that stop a deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to prepare workspace at {}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create container {name}")]
    CreateFailed {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("expected to run commands in container {expected}, but the current container is {actual}")]
    IdentityMismatch { expected: String, actual: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}
