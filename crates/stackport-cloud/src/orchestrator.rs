//! Stack lifecycle orchestration
//!
//! ```text
//! Absent ──create──▶ Creating ──apply──▶ Live ──update──▶ Updating ──apply──▶ Live
//!                                         │
//!                                         └──delete──▶ Destroying ──forget──▶ Absent
//! ```
//!
//! Every mutating operation talks to the engine first and then edits the
//! listing cache directly. When the cache edit cannot be made the stack is
//! `Live` in the engine but stale in the cache; that is logged and left for
//! the reconciler to repair on the next cache miss.
//!
//! Serializing mutations of one stack is the engine's job. The only lock taken
//! here guards the cache read-modify-write and is never held across an engine
//! call.

use crate::cache::ListingCache;
use crate::engine::{EngineClient, EngineError, LogObserver, StackOutputs, bounded};
use crate::error::{Result, StackError};
use crate::kind::{OWNER_OUTPUT, ResourceKind};
use crate::listing::{CacheLocks, CacheWrite, EditOutcome, ListingEdit, edit_cached};
use crate::program::{Program, literal};
use crate::reconciler::Reconciler;
use crate::summary::{ConsoleLinks, Summary};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Lifecycle state of a stack, as traced by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Absent,
    Creating,
    Live,
    /// Live in the engine, but the listing cache was not updated
    LiveStale,
    Updating,
    Destroying,
}

impl std::fmt::Display for StackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackState::Absent => write!(f, "absent"),
            StackState::Creating => write!(f, "creating"),
            StackState::Live => write!(f, "live"),
            StackState::LiveStale => write!(f, "live (stale listing)"),
            StackState::Updating => write!(f, "updating"),
            StackState::Destroying => write!(f, "destroying"),
        }
    }
}

/// Timeouts for engine calls and cache locking
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Upper bound for a single engine call (an apply can take minutes)
    pub engine_timeout: Duration,

    /// How long to wait for the per-kind cache lock before skipping the write
    pub cache_lock_timeout: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            engine_timeout: Duration::from_secs(30 * 60),
            cache_lock_timeout: Duration::from_secs(2),
        }
    }
}

/// Creates, updates and destroys stacks and keeps the listing cache in step
pub struct Orchestrator {
    engine: Arc<dyn EngineClient>,
    cache: Arc<dyn ListingCache>,
    links: ConsoleLinks,
    locks: Arc<CacheLocks>,
    options: OrchestratorOptions,
    reconciler: Reconciler,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        cache: Arc<dyn ListingCache>,
        links: ConsoleLinks,
        options: OrchestratorOptions,
    ) -> Self {
        let locks = Arc::new(CacheLocks::new());
        let reconciler = Reconciler::new(
            engine.clone(),
            cache.clone(),
            links.clone(),
            locks.clone(),
            options.clone(),
        );
        Self {
            engine,
            cache,
            links,
            locks,
            options,
            reconciler,
        }
    }

    pub fn engine(&self) -> &Arc<dyn EngineClient> {
        &self.engine
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub async fn list<K: ResourceKind>(&self, kind: &K) -> Result<Vec<Summary>> {
        self.reconciler.list(kind).await
    }

    /// Create stack `name` and apply the program built from `params`
    pub async fn create<K: ResourceKind>(
        &self,
        kind: &K,
        name: &str,
        params: &K::Params,
        owner: Option<&str>,
    ) -> Result<Summary> {
        let program = build(kind, params, owner)?;
        let span = tracing::info_span!("create", kind = kind.key(), stack = name);

        async {
            tracing::info!(state = %StackState::Creating, "Creating stack");

            let handle = match self
                .call("create", name, self.engine.create(name, program))
                .await
            {
                Ok(handle) => handle,
                Err(EngineError::AlreadyExists(_)) => {
                    tracing::info!("Stack already exists");
                    return Err(StackError::DuplicateName(name.to_string()));
                }
                Err(e) => return Err(self.fail("create", name, e)),
            };

            let observer = LogObserver::new(name);
            let outputs = self
                .call("apply", name, self.engine.apply(&handle, &observer))
                .await
                .map_err(|e| self.fail("apply", name, e))?;
            tracing::info!(state = %StackState::Live, "Stack applied");

            let summary = kind
                .to_summary(name, &outputs, &self.links)
                .inspect_err(|e| tracing::error!("Apply produced unusable outputs: {}", e))?;

            self.edit_listing("create", kind.key(), ListingEdit::Upsert(summary.clone()))
                .await;
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Apply a new program to the existing stack `name`
    ///
    /// A concurrent update is reported as [`StackError::ConcurrentUpdate`] and
    /// never retried.
    pub async fn update<K: ResourceKind>(
        &self,
        kind: &K,
        name: &str,
        params: &K::Params,
        owner: Option<&str>,
    ) -> Result<Summary> {
        let mut program = build(kind, params, owner)?;
        let span = tracing::info_span!("update", kind = kind.key(), stack = name);

        async {
            let current = self.outputs_of(kind, name).await?;
            // Keep the stack in its owner's listing when no owner was given
            if owner.is_none() {
                if let Some(previous) = current.get(OWNER_OUTPUT) {
                    program.set_output(OWNER_OUTPUT, serde_json::json!(literal(previous)));
                }
            }

            let handle = self
                .call("select", name, self.engine.select(name, program))
                .await
                .map_err(|e| self.fail("select", name, e))?;

            tracing::info!(state = %StackState::Updating, "Updating stack");

            let observer = LogObserver::new(name);
            let outputs = self
                .call("apply", name, self.engine.apply(&handle, &observer))
                .await
                .map_err(|e| self.fail("apply", name, e))?;
            tracing::info!(state = %StackState::Live, "Stack applied");

            let summary = kind
                .to_summary(name, &outputs, &self.links)
                .inspect_err(|e| tracing::error!("Apply produced unusable outputs: {}", e))?;

            self.edit_listing("update", kind.key(), ListingEdit::Upsert(summary.clone()))
                .await;
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Destroy every resource of `name` and release the name
    pub async fn delete<K: ResourceKind>(&self, kind: &K, name: &str) -> Result<()> {
        let span = tracing::info_span!("delete", kind = kind.key(), stack = name);

        async {
            self.outputs_of(kind, name).await?;

            let handle = self
                .call("select", name, self.engine.select(name, Program::noop()))
                .await
                .map_err(|e| self.fail("select", name, e))?;

            tracing::info!(state = %StackState::Destroying, "Destroying stack");

            let observer = LogObserver::new(name);
            self.call("destroy", name, self.engine.destroy(&handle, &observer))
                .await
                .map_err(|e| self.fail("destroy", name, e))?;

            self.call("forget", name, self.engine.forget(name))
                .await
                .map_err(|e| self.fail("forget", name, e))?;

            tracing::info!(state = %StackState::Absent, "Stack destroyed");

            self.edit_listing("delete", kind.key(), ListingEdit::Remove(name.to_string()))
                .await;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Last-applied parameters of `name`, read from its outputs
    pub async fn show<K: ResourceKind>(&self, kind: &K, name: &str) -> Result<K::Details> {
        let outputs = self
            .call("outputs", name, self.engine.outputs(name))
            .await
            .map_err(|e| self.fail("outputs", name, e))?;

        if !kind.matches(&outputs) {
            return Err(StackError::NotFound(name.to_string()));
        }
        Ok(kind.details(&outputs))
    }

    /// Current outputs of `name`, refusing stacks that belong to another kind
    ///
    /// A stack without outputs (never applied, or already destroyed) is
    /// accepted so it can still be repaired or removed.
    async fn outputs_of<K: ResourceKind>(&self, kind: &K, name: &str) -> Result<StackOutputs> {
        let outputs = self
            .call("outputs", name, self.engine.outputs(name))
            .await
            .map_err(|e| self.fail("outputs", name, e))?;

        if !outputs.is_empty() && !kind.matches(&outputs) {
            tracing::info!(stack = name, "Stack is not a {}", kind.label());
            return Err(StackError::NotFound(name.to_string()));
        }
        Ok(outputs)
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        name: &str,
        call: impl std::future::Future<Output = std::result::Result<T, EngineError>>,
    ) -> std::result::Result<T, EngineError> {
        bounded(self.options.engine_timeout, operation, name, call).await
    }

    /// Log an engine failure at the right severity and convert it
    fn fail(&self, operation: &str, name: &str, err: EngineError) -> StackError {
        match &err {
            EngineError::ConcurrentUpdate(_) => {
                tracing::info!(operation, stack = name, "Stack already has an update in progress");
            }
            EngineError::NotFound(_) | EngineError::AlreadyExists(_) => {
                tracing::info!(operation, stack = name, "{}", err);
            }
            _ => {
                tracing::error!(operation, stack = name, "Engine call failed: {}", err);
            }
        }
        err.into()
    }

    /// Apply `edit` to the cached list for `key`; failures leave the listing stale
    async fn edit_listing(&self, operation: &str, key: &str, edit: ListingEdit) {
        let name = edit.stack_name().to_string();
        // State the stack is left in when the listing cannot be edited
        let stale = if matches!(edit, ListingEdit::Remove(_)) {
            StackState::Absent
        } else {
            StackState::LiveStale
        };

        let Some(_guard) = self
            .locks
            .acquire(key, self.options.cache_lock_timeout)
            .await
        else {
            tracing::warn!(
                state = %stale,
                "Listing cache for '{}' busy, skipped update for '{}'",
                key,
                name
            );
            return;
        };

        match edit_cached(self.cache.as_ref(), key, edit).await {
            Ok(CacheWrite::Written(EditOutcome::Missing)) => {
                tracing::error!(
                    "'{}' was not in the '{}' listing; cache and engine had diverged",
                    name,
                    key
                );
            }
            Ok(CacheWrite::Written(EditOutcome::Appended)) if operation == "update" => {
                tracing::warn!(
                    "'{}' was not in the '{}' listing, appended it",
                    name,
                    key
                );
            }
            Ok(CacheWrite::Written(outcome)) => {
                tracing::debug!(?outcome, "Listing cache updated");
            }
            Ok(CacheWrite::Absent) => {
                tracing::debug!("No cached '{}' listing, nothing to remove", key);
            }
            Err(e) => {
                tracing::error!(
                    state = %stale,
                    "Failed to update '{}' listing for '{}': {}",
                    key,
                    name,
                    e
                );
            }
        }
    }
}

/// Build the program for `params`, tagging it with the owner when known
fn build<K: ResourceKind>(kind: &K, params: &K::Params, owner: Option<&str>) -> Result<Program> {
    let mut program = kind.build_program(params)?;
    if let Some(owner) = owner {
        program.set_output(OWNER_OUTPUT, serde_json::json!(literal(owner)));
    }
    Ok(program)
}
