//! Listing reconciler
//!
//! Serves listings from the cache and rebuilds a kind's list from the engine
//! when its cache entry is absent. This is the only place that scans every
//! stack of the project.

use crate::cache::{CacheError, ListingCache};
use crate::engine::{EngineClient, bounded};
use crate::error::Result;
use crate::kind::ResourceKind;
use crate::listing::CacheLocks;
use crate::orchestrator::OrchestratorOptions;
use crate::summary::{ConsoleLinks, Summary};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Rebuilds listings from the engine on cache misses
pub struct Reconciler {
    engine: Arc<dyn EngineClient>,
    cache: Arc<dyn ListingCache>,
    links: ConsoleLinks,
    locks: Arc<CacheLocks>,
    options: OrchestratorOptions,
}

impl Reconciler {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        cache: Arc<dyn ListingCache>,
        links: ConsoleLinks,
        locks: Arc<CacheLocks>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            engine,
            cache,
            links,
            locks,
            options,
        }
    }

    /// Summaries of every live stack of `kind`
    pub async fn list<K: ResourceKind>(&self, kind: &K) -> Result<Vec<Summary>> {
        let key = kind.key();

        match self.cached(key).await {
            Some(summaries) => {
                tracing::debug!(kind = key, "Serving {} cached summaries", summaries.len());
                Ok(summaries)
            }
            None => self.reconcile(kind).await,
        }
    }

    /// Summaries of the stacks of `kind` created by `owner`
    pub async fn list_for_owner<K: ResourceKind>(
        &self,
        kind: &K,
        owner: &str,
    ) -> Result<Vec<Summary>> {
        let mut summaries = self.list(kind).await?;
        summaries.retain(|s| s.is_owned_by(owner));
        Ok(summaries)
    }

    /// Drop the cached list and rebuild it from the engine
    pub async fn refresh<K: ResourceKind>(&self, kind: &K) -> Result<Vec<Summary>> {
        self.cache.invalidate(kind.key()).await?;
        self.reconcile(kind).await
    }

    async fn cached(&self, key: &str) -> Option<Vec<Summary>> {
        match self.cache.exists(key).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!(kind = key, "Listing cache unavailable, reading the engine: {}", e);
                return None;
            }
        }

        match self.cache.get(key).await {
            Ok(summaries) => Some(summaries),
            // Invalidated between the two calls
            Err(CacheError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(kind = key, "Listing cache unreadable, reading the engine: {}", e);
                None
            }
        }
    }

    /// Scan the engine, keep the stacks of `kind` and write the list to the cache
    pub async fn reconcile<K: ResourceKind>(&self, kind: &K) -> Result<Vec<Summary>> {
        let key = kind.key();
        tracing::info!(kind = key, "Rebuilding listing from the engine");

        let stacks = bounded(
            self.options.engine_timeout,
            "list",
            self.links.project(),
            self.engine.list_all(),
        )
        .await
        .inspect_err(|e| {
            tracing::error!(kind = key, "Failed to list stacks: {}", e);
        })?;

        let total = stacks.len();
        let mut by_name = BTreeMap::new();
        for stack in stacks {
            if !kind.matches(&stack.outputs) {
                continue;
            }
            match kind.to_summary(&stack.name, &stack.outputs, &self.links) {
                Ok(summary) => {
                    by_name.insert(stack.name, summary);
                }
                Err(e) => {
                    tracing::warn!(kind = key, stack = %stack.name, "Skipping stack: {}", e);
                }
            }
        }
        let summaries: Vec<Summary> = by_name.into_values().collect();

        tracing::info!(
            kind = key,
            "Found {} of {} stacks",
            summaries.len(),
            total
        );

        match self
            .locks
            .acquire(key, self.options.cache_lock_timeout)
            .await
        {
            Some(_guard) => {
                if let Err(e) = self.cache.set(key, &summaries).await {
                    tracing::error!(kind = key, "Failed to write listing cache: {}", e);
                }
            }
            None => {
                tracing::warn!(kind = key, "Listing cache busy, not writing rebuilt list");
            }
        }

        Ok(summaries)
    }
}
