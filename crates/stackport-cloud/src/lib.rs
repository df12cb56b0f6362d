//! Stackport stack lifecycle
//!
//! This crate orchestrates named infrastructure stacks (static websites,
//! virtual machines) on an external infrastructure-as-code engine and keeps a
//! listing cache of them for fast reads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              stackport CLI / web UI              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                stackport-cloud                   │
//! │  ┌──────────────────┐   ┌──────────────────┐    │
//! │  │   Orchestrator   │──▶│    Reconciler    │    │
//! │  └───┬─────────┬────┘   └───┬─────────┬────┘    │
//! │      │   ResourceKind (SiteKind, VmKind)  │      │
//! │  ┌───▼─────────▼──┐   ┌─────────────────▼─┐     │
//! │  │  EngineClient  │   │   ListingCache    │     │
//! │  └───────┬────────┘   └───────────────────┘     │
//! └──────────┼──────────────────────────────────────┘
//!            │
//! ┌──────────▼──────────┐
//! │  stackport-pulumi   │
//! └─────────────────────┘
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod kind;
pub mod listing;
pub mod orchestrator;
pub mod program;
pub mod reconciler;
pub mod summary;

// Re-exports
pub use cache::{CacheError, FileCache, ListingCache, MemoryCache};
pub use engine::{
    AuthStatus, EngineClient, EngineError, LogObserver, ProgressObserver, StackHandle, StackInfo,
    StackOutputs,
};
pub use error::{Result, StackError};
pub use fetch::{ContentFetcher, ContentSource};
pub use kind::{ResourceKind, SiteDetails, SiteKind, SiteParams, VmDetails, VmKind, VmParams};
pub use orchestrator::{Orchestrator, OrchestratorOptions, StackState};
pub use program::{Program, Resource};
pub use reconciler::Reconciler;
pub use summary::{ConsoleLinks, Summary};
