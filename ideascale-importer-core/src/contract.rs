//! # contract: the seam between the pipeline and the remote API
//!
//! The import pipeline never talks HTTP directly. It asks a [`Fetcher`] for
//! JSON documents by API path and treats any error as "this page or listing
//! is unavailable". [`crate::fetch::HttpFetcher`] is the production
//! implementation; tests use the generated `MockFetcher`.

use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;

use crate::error::FetchError;

/// Read-only access to the ideation API.
///
/// `path` is relative to the configured API base URL and starts with `/`,
/// e.g. `/v1/stages/4590/ideas/0/50`. Implementors own authentication and
/// retry; callers see only the final outcome.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError>;
}
