//! Provisioning engine contract
//!
//! The engine (an infrastructure-as-code automation tool) owns the truth about
//! which stacks exist and what they export. Everything in this crate talks to
//! it through [`EngineClient`].

use crate::program::Program;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by an engine client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("stack '{0}' already exists")]
    AlreadyExists(String),

    #[error("stack '{0}' not found")]
    NotFound(String),

    #[error("stack '{0}' has another update in progress")]
    ConcurrentUpdate(String),

    #[error("{operation} of stack '{stack}' timed out")]
    Timeout {
        operation: &'static str,
        stack: String,
    },

    #[error("stack '{stack}' is missing required output '{key}'")]
    MissingOutput { stack: String, key: String },

    #[error("{0}")]
    Failed(String),
}

/// Infrastructure-as-code engine abstraction
///
/// Implementations must not retry on their own: a concurrent update is
/// reported as [`EngineError::ConcurrentUpdate`] and left to the caller.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Returns the engine name (e.g., "pulumi")
    fn name(&self) -> &str;

    /// Check that the engine is installed and logged in
    async fn check_auth(&self) -> Result<AuthStatus, EngineError>;

    /// Register a new stack bound to `program`. Does not apply it.
    async fn create(&self, name: &str, program: Program) -> Result<StackHandle, EngineError>;

    /// Obtain a handle on an existing stack, bound to `program`
    async fn select(&self, name: &str, program: Program) -> Result<StackHandle, EngineError>;

    /// Apply the stack's program and return its outputs
    async fn apply(
        &self,
        stack: &StackHandle,
        observer: &dyn ProgressObserver,
    ) -> Result<StackOutputs, EngineError>;

    /// Tear down every resource of the stack
    async fn destroy(
        &self,
        stack: &StackHandle,
        observer: &dyn ProgressObserver,
    ) -> Result<(), EngineError>;

    /// Drop the engine's bookkeeping for `name` so it can be reused
    async fn forget(&self, name: &str) -> Result<(), EngineError>;

    /// Outputs of a single stack
    async fn outputs(&self, name: &str) -> Result<StackOutputs, EngineError>;

    /// Every stack of the project with its current outputs
    async fn list_all(&self) -> Result<Vec<StackInfo>, EngineError>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Handle on a selected or freshly created stack
#[derive(Debug, Clone)]
pub struct StackHandle {
    pub name: String,
    pub program: Program,
}

impl StackHandle {
    pub fn new(name: impl Into<String>, program: Program) -> Self {
        Self {
            name: name.into(),
            program,
        }
    }
}

/// A stack as seen by a project-wide listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackInfo {
    pub name: String,
    pub outputs: StackOutputs,
}

/// Typed view over the string-keyed outputs of a stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackOutputs {
    values: BTreeMap<String, String>,
}

impl StackOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get an output that a successful apply must have produced
    pub fn require(&self, stack: &str, key: &str) -> Result<&str, EngineError> {
        self.get(key).ok_or_else(|| EngineError::MissingOutput {
            stack: stack.to_string(),
            key: key.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for StackOutputs {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Receives engine progress output while an apply or destroy runs
pub trait ProgressObserver: Send + Sync {
    fn on_output(&self, line: &str);
}

/// Forwards engine progress to the log
#[derive(Debug, Clone)]
pub struct LogObserver {
    stack: String,
}

impl LogObserver {
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
        }
    }
}

impl ProgressObserver for LogObserver {
    fn on_output(&self, line: &str) {
        let line = line.trim_end();
        if !line.is_empty() {
            tracing::info!(stack = %self.stack, "{}", line);
        }
    }
}

/// Run an engine call with an upper bound on its duration
pub async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    stack: &str,
    call: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            operation,
            stack: stack.to_string(),
        }),
    }
}
