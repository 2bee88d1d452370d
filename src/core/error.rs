use std::io;
use thiserror::Error;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 3;
/// Bundle drift was found on disk.
pub const EXIT_TAMPER: i32 = 4;
pub const EXIT_CYCLE: i32 = 5;

#[derive(Error, Debug)]
pub enum VerdictError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Dependency cycle detected at transcript {0}")]
    CycleDetected(String),
    #[error(
        "Cross-workspace dependency: transcript {transcript} belongs to workspace '{owner}', not '{workspace}' (pass --allow-cross-workspace to override)"
    )]
    CrossWorkspaceViolation {
        transcript: String,
        owner: String,
        workspace: String,
    },
}

impl VerdictError {
    pub fn exit_code(&self) -> i32 {
        match self {
            VerdictError::NotFound(_) => EXIT_NOT_FOUND,
            VerdictError::CycleDetected(_) => EXIT_CYCLE,
            _ => EXIT_FAILURE,
        }
    }
}
