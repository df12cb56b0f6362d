//! Site content retrieval

use crate::error::{Result, StackError};
use std::time::Duration;

/// Where the HTML for a site comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Inline(String),
    Url(String),
}

impl ContentSource {
    /// A non-empty URL wins over inline content, like the create form
    pub fn from_form(inline: Option<String>, url: Option<String>) -> Self {
        match url.filter(|u| !u.trim().is_empty()) {
            Some(url) => ContentSource::Url(url.trim().to_string()),
            None => ContentSource::Inline(inline.unwrap_or_default()),
        }
    }
}

/// Fetches remote page content with a bounded timeout
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
}

impl ContentFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stackport/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StackError::ContentFetch(e.to_string()))?;
        Ok(Self { client })
    }

    /// Resolve a source to the HTML string
    pub async fn resolve(&self, source: &ContentSource) -> Result<String> {
        match source {
            ContentSource::Inline(content) => Ok(content.clone()),
            ContentSource::Url(url) => self.fetch(url).await,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "Fetching site content");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                StackError::ContentFetch(format!("{url}: timed out"))
            } else {
                StackError::ContentFetch(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StackError::ContentFetch(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| StackError::ContentFetch(format!("{url}: {e}")))
    }
}
