//! Error taxonomy for stack operations

use crate::cache::CacheError;
use crate::engine::EngineError;
use thiserror::Error;

/// Errors surfaced by the orchestrator and the reconciler
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Stack already exists: {0}")]
    DuplicateName(String),

    #[error("Stack already has an update in progress: {0}")]
    ConcurrentUpdate(String),

    #[error("Stack not found: {0}")]
    NotFound(String),

    #[error("Public key material is required")]
    MissingKeyMaterial,

    #[error("Instance type '{requested}' is not allowed (allowed: {})", allowed.join(", "))]
    InvalidInstanceType {
        requested: String,
        allowed: Vec<String>,
    },

    #[error("Failed to fetch content: {0}")]
    ContentFetch(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl StackError {
    /// Conditions the user can fix by themselves (pick another name, retry later, ...)
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(self, StackError::Engine(_) | StackError::Cache(_))
    }

    /// One-line message suitable for showing to the end user.
    ///
    /// Engine and cache failures never leak their details here; those are
    /// logged where they happen.
    pub fn user_message(&self, label: &str) -> String {
        match self {
            StackError::DuplicateName(name) => {
                format!("{label} with name '{name}' already exists, pick a unique name")
            }
            StackError::ConcurrentUpdate(name) => {
                format!("{label} '{name}' already has an update in progress")
            }
            StackError::NotFound(name) => format!("{label} '{name}' does not exist"),
            StackError::MissingKeyMaterial => {
                "A public key is required to create a virtual machine".to_string()
            }
            StackError::InvalidInstanceType { requested, allowed } => format!(
                "Instance type '{requested}' is not available, choose one of: {}",
                allowed.join(", ")
            ),
            StackError::ContentFetch(reason) => {
                format!("Could not fetch the page content: {reason}")
            }
            StackError::Engine(_) | StackError::Cache(_) => "Something went wrong".to_string(),
        }
    }
}

impl From<EngineError> for StackError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AlreadyExists(name) => StackError::DuplicateName(name),
            EngineError::ConcurrentUpdate(name) => StackError::ConcurrentUpdate(name),
            EngineError::NotFound(name) => StackError::NotFound(name),
            EngineError::Failed(message) => StackError::Engine(message),
            EngineError::Timeout { operation, stack } => {
                StackError::Engine(format!("{operation} of '{stack}' timed out"))
            }
            EngineError::MissingOutput { stack, key } => {
                StackError::Engine(format!("stack '{stack}' has no output '{key}'"))
            }
        }
    }
}

impl From<CacheError> for StackError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound(key) => StackError::NotFound(key),
            other => StackError::Cache(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
