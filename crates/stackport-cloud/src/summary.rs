//! Listing summaries
//!
//! A [`Summary`] is the UI-facing projection of a stack. It is never
//! authoritative: every field can be derived again from the stack outputs.

use serde::{Deserialize, Serialize};

/// Cached projection of a live stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Stack name
    pub name: String,

    /// Website endpoint (sites only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Public DNS name (virtual machines only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,

    /// Link to the stack in the engine's web console
    pub console_url: String,

    /// Opaque id of the user that created the stack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Summary {
    pub fn site(name: impl Into<String>, url: impl Into<String>, console_url: String) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            dns_name: None,
            console_url,
            owner: None,
        }
    }

    pub fn vm(name: impl Into<String>, dns_name: impl Into<String>, console_url: String) -> Self {
        Self {
            name: name.into(),
            url: None,
            dns_name: Some(dns_name.into()),
            console_url,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    /// The kind-specific endpoint field, whichever is set
    pub fn endpoint(&self) -> Option<&str> {
        self.url.as_deref().or(self.dns_name.as_deref())
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner.as_deref() == Some(owner)
    }
}

/// Builds console URLs for stacks without asking the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLinks {
    base: String,
    organization: String,
    project: String,
}

impl ConsoleLinks {
    pub fn new(
        base: impl Into<String>,
        organization: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            organization: organization.into(),
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn stack_url(&self, stack: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base, self.organization, self.project, stack
        )
    }
}
