use std::time::Duration;

use super::types::ResourceKind;

/// Failures reported by the container engine or by talking to it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("failed to invoke `{program}` (is it installed and on PATH?)")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed (exit {code:?}): {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("unexpected output from `{command}`")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid command line {cmd:?}")]
    InvalidCommand {
        cmd: String,
        #[source]
        source: shell_words::ParseError,
    },

    #[error("empty command line")]
    EmptyCommand,

    #[error("command did not finish within {0:?}")]
    Timeout(Duration),

    #[error("container engine is not running: {0}")]
    Unavailable(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }
}

/// Whether an engine error message says that an object of `kind` does not
/// exist. A missing object of another kind does not count.
pub(crate) fn looks_not_found(stderr: &str, kind: ResourceKind) -> bool {
    let lower = stderr.to_ascii_lowercase();
    let missing = lower.contains("no such ") || lower.contains("not found");
    missing && lower.contains(&kind.to_string())
}
