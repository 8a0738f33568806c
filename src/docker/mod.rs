// Container engine access: the engine trait, the docker CLI backend, and the
// reconciling operations built on top of them.

pub mod cli;
pub mod engine;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod reconcile;
pub mod run;
pub mod types;

pub use cli::{DEFAULT_PROGRAM, DockerCli, split_command};
pub use engine::Engine;
pub use error::EngineError;
pub use reconcile::{create_container, create_network, exec_in_container};
pub use run::run_streaming;
pub use types::{
    ContainerHandle, DEFAULT_BRIDGE, ExecOutput, IpamPool, NetworkHandle, NetworkInfo,
    NetworkMember, NetworkOutcome, ResourceKind,
};
