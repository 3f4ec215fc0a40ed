//! Search backend abstraction.
//!
//! The [`SearchBackend`] trait is the only way the pipeline talks to the
//! search index. Production deployments put an OpenSearch client behind it;
//! [`memory::InMemoryBackend`] evaluates queries over JSON documents for
//! tests and small local indexes.
//!
//! Implementations must be `Send + Sync`. They own timeouts and retries;
//! the pipeline surfaces any failure as
//! [`RegistryError::BackendUnavailable`](crate::error::RegistryError::BackendUnavailable).

pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::constraint::GroupConstraint;
use crate::error::Result;
use crate::identifiers::{Lid, Vid};
use crate::query::SearchQuery;

/// One matched document.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Document id (the lidvid for registry products).
    pub id: String,
    /// Stored fields, restricted to the query projection if one was given.
    pub source: Map<String, Value>,
}

/// The page of hits for a query plus the total match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub hits: Vec<Hit>,
    pub total: u64,
}

/// Abstract search index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`execute`](SearchBackend::execute) | Run a structured query, one round trip |
/// | [`resolve_latest_version`](SearchBackend::resolve_latest_version) | Most recent vid of a lid within a scope |
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a query and return the requested window of hits.
    async fn execute(&self, query: &SearchQuery) -> Result<SearchHits>;

    /// Return the most recent version of `lid` visible under `scope`, or
    /// `None` if no version is visible.
    async fn resolve_latest_version(&self, lid: &Lid, scope: &GroupConstraint)
        -> Result<Option<Vid>>;
}

#[async_trait]
impl<B: SearchBackend + ?Sized> SearchBackend for std::sync::Arc<B> {
    async fn execute(&self, query: &SearchQuery) -> Result<SearchHits> {
        (**self).execute(query).await
    }

    async fn resolve_latest_version(
        &self,
        lid: &Lid,
        scope: &GroupConstraint,
    ) -> Result<Option<Vid>> {
        (**self).resolve_latest_version(lid, scope).await
    }
}
