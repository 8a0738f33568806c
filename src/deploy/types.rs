use serde::Serialize;

use crate::docker::NetworkOutcome;

/// Result of one command run inside a container.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub cmd: String,
    pub workdir: Option<String>,
    pub exit_code: Option<i32>,
    pub status: String,
    pub log: String,
}

impl CommandResult {
    pub fn passed(&self) -> bool {
        self.status == "pass"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Everything `run_commands` did in one container.
#[derive(Debug, Clone, Serialize)]
pub struct ExecReport {
    pub container: String,
    pub commands: Vec<CommandResult>,
    pub summary: Summary,
}

impl ExecReport {
    pub fn new(container: impl Into<String>, commands: Vec<CommandResult>) -> Self {
        let passed = commands.iter().filter(|c| c.passed()).count();
        let summary = Summary {
            total: commands.len(),
            passed,
            failed: commands.len() - passed,
        };
        Self {
            container: container.into(),
            commands,
            summary,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }
}

/// How reconciling one configured network went.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkStatus {
    pub name: String,
    pub status: String,
    pub id: Option<String>,
    pub error: Option<String>,
}

impl NetworkStatus {
    pub fn from_outcome(name: &str, outcome: &NetworkOutcome) -> Self {
        Self {
            name: name.to_string(),
            status: outcome.as_str().to_string(),
            id: Some(outcome.handle().id.clone()),
            error: None,
        }
    }

    pub fn failed(name: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            status: "failed".to_string(),
            id: None,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Collected output of a full `up` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeployReport {
    pub networks: Vec<NetworkStatus>,
    pub containers: Vec<ExecReport>,
    pub summary: Summary,
}

impl DeployReport {
    pub fn new(networks: Vec<NetworkStatus>, containers: Vec<ExecReport>) -> Self {
        let summary = containers.iter().fold(Summary::default(), |acc, r| Summary {
            total: acc.total + r.summary.total,
            passed: acc.passed + r.summary.passed,
            failed: acc.failed + r.summary.failed,
        });
        Self {
            networks,
            containers,
            summary,
        }
    }
}
