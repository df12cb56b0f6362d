//! Pulumi engine error types

use stackport_cloud::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulumiError {
    #[error("pulumi not found. Please install: curl -fsSL https://get.pulumi.com | sh")]
    PulumiNotFound,

    #[error("pulumi command failed: {0}")]
    CommandFailed(String),

    #[error("Stack already exists: {0}")]
    StackAlreadyExists(String),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Stack has an update in progress: {0}")]
    ConcurrentUpdate(String),

    #[error("Invalid stack name: {0}")]
    InvalidStackName(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PulumiError {
    /// Map the stderr of a failed pulumi command on `stack` to an error
    pub fn classify(stack: &str, stderr: &str) -> Self {
        let lower = stderr.to_lowercase();

        if lower.contains("[409]")
            || lower.contains("currently in progress")
            || lower.contains("stack is currently locked")
        {
            PulumiError::ConcurrentUpdate(stack.to_string())
        } else if lower.contains("no stack named") || lower.contains("stack not found") {
            PulumiError::StackNotFound(stack.to_string())
        } else {
            PulumiError::CommandFailed(stderr.trim().to_string())
        }
    }

    /// Like [`classify`](Self::classify), for `stack init`, the only command
    /// whose "already exists" is about the stack itself
    pub fn classify_init(stack: &str, stderr: &str) -> Self {
        let lower = stderr.to_lowercase();

        if lower.contains("stack") && lower.contains("already exists") {
            PulumiError::StackAlreadyExists(stack.to_string())
        } else {
            Self::classify(stack, stderr)
        }
    }
}

impl From<PulumiError> for EngineError {
    fn from(err: PulumiError) -> Self {
        match err {
            PulumiError::StackAlreadyExists(name) => EngineError::AlreadyExists(name),
            PulumiError::StackNotFound(name) => EngineError::NotFound(name),
            PulumiError::ConcurrentUpdate(name) => EngineError::ConcurrentUpdate(name),
            other => EngineError::Failed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PulumiError>;
