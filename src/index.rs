//! Local search index and backend wiring.
//!
//! The index is a JSON file holding an array of registry documents (one
//! object per product version, fields in index notation). It is loaded into
//! an [`InMemoryBackend`] and wrapped in a [`TimeoutBackend`] that enforces
//! `[index].timeout_ms` on every round trip.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use pds_registry_core::backend::memory::InMemoryBackend;
use pds_registry_core::backend::{SearchBackend, SearchHits};
use pds_registry_core::constraint::{GroupConstraint, GroupRegistry};
use pds_registry_core::identifiers::{Lid, Vid};
use pds_registry_core::query::SearchQuery;
use pds_registry_core::{Registry, RegistryError};

use crate::config::Config;

/// What was loaded, reported by `/health`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexInfo {
    pub path: PathBuf,
    pub documents: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Read the index file into an in-memory backend.
///
/// Entries that are not JSON objects are skipped with a warning.
pub fn load_documents(path: &Path) -> Result<(InMemoryBackend, IndexInfo)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse index file: {}", path.display()))?;

    let entries = match value {
        Value::Array(entries) => entries,
        _ => anyhow::bail!("index file {} must hold a JSON array", path.display()),
    };

    let mut backend = InMemoryBackend::new();
    for (position, entry) in entries.into_iter().enumerate() {
        match entry {
            Value::Object(doc) => backend.push(doc),
            other => warn!(
                "skipping index entry {}: expected an object, found {}",
                position,
                kind_of(&other)
            ),
        }
    }

    let info = IndexInfo {
        path: path.to_path_buf(),
        documents: backend.len(),
        loaded_at: Utc::now(),
    };
    info!("loaded {} documents from {}", info.documents, path.display());
    Ok((backend, info))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Backend wrapper that bounds every call with a deadline.
pub struct TimeoutBackend<B> {
    inner: B,
    timeout: Duration,
}

impl<B> TimeoutBackend<B> {
    pub fn new(inner: B, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

fn timed_out(timeout: Duration) -> RegistryError {
    RegistryError::BackendUnavailable {
        message: format!("search timed out after {} ms", timeout.as_millis()),
    }
}

#[async_trait]
impl<B: SearchBackend> SearchBackend for TimeoutBackend<B> {
    async fn execute(&self, query: &SearchQuery) -> pds_registry_core::Result<SearchHits> {
        tokio::time::timeout(self.timeout, self.inner.execute(query))
            .await
            .map_err(|_| timed_out(self.timeout))?
    }

    async fn resolve_latest_version(
        &self,
        lid: &Lid,
        scope: &GroupConstraint,
    ) -> pds_registry_core::Result<Option<Vid>> {
        tokio::time::timeout(self.timeout, self.inner.resolve_latest_version(lid, scope))
            .await
            .map_err(|_| timed_out(self.timeout))?
    }
}

/// Build the shared [`Registry`] for a configuration.
pub fn open_registry(config: &Config) -> Result<(Registry, IndexInfo)> {
    let (backend, info) = load_documents(&config.index.path)?;
    let backend = TimeoutBackend::new(backend, Duration::from_millis(config.index.timeout_ms));

    let mut groups = GroupRegistry::with_builtins();
    for (name, constraint) in &config.groups {
        groups.register(name.clone(), constraint.clone());
    }

    let mut registry = Registry::new(Arc::new(backend))
        .with_groups(groups)
        .with_max_limit(config.registry.max_limit);
    if config.registry.archive_filter {
        registry = registry.with_archive_filter(GroupConstraint::archived());
    }
    Ok((registry, info))
}
