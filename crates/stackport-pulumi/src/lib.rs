//! Pulumi engine for Stackport
//!
//! This crate implements the `EngineClient` trait on top of the `pulumi` CLI,
//! running stack programs as Pulumi YAML projects.
//!
//! # Requirements
//!
//! - `pulumi` CLI must be installed and logged in (`pulumi login`)
//! - AWS credentials must be available to the CLI
//!
//! # Example
//!
//! ```ignore
//! use stackport_cloud::EngineClient;
//! use stackport_pulumi::PulumiEngine;
//!
//! let engine = PulumiEngine::new("stackport", "us-east-1", "/var/lib/stackport");
//!
//! // Check authentication
//! let auth = engine.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//!
//! // List every stack in the project with its outputs
//! let stacks = engine.list_all().await?;
//! ```

pub mod error;
pub mod project;
pub mod provider;
pub mod pulumi;

pub use error::{PulumiError, Result};
pub use provider::{PulumiEngine, validate_stack_name};
pub use pulumi::{Pulumi, StackSummary, WhoAmI};
