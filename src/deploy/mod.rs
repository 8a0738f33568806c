mod error;
mod orchestrator;
mod types;
pub mod workspace;

pub use error::DeployError;
pub use orchestrator::Deployer;
pub use types::{CommandResult, DeployReport, ExecReport, NetworkStatus, Summary};
