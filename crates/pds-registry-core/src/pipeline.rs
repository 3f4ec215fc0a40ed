//! The request pipeline facade.
//!
//! [`Registry`] owns the immutable collaborators (backend, format table,
//! named groups, archive filter) and runs each request through
//! negotiation → resolution → query construction → assembly.

use std::sync::Arc;

use tracing::info;

use crate::backend::SearchBackend;
use crate::constraint::{compose, GroupConstraint, GroupRegistry};
use crate::context::{NegotiatedResponse, Pagination, RequestContext, RequestParams};
use crate::error::{RegistryError, Result};
use crate::format::FormatRegistry;
use crate::identifiers::VersionSelector;
use crate::response::{assemble, assemble_batch};

pub const DEFAULT_MAX_LIMIT: usize = 10_000;

/// Shared, read-only entry point for registry requests.
#[derive(Clone)]
pub struct Registry {
    backend: Arc<dyn SearchBackend>,
    formats: FormatRegistry,
    groups: GroupRegistry,
    archive: Option<GroupConstraint>,
    max_limit: usize,
}

impl Registry {
    /// A registry with default formats, built-in groups and no archive filter.
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            formats: FormatRegistry::with_defaults(),
            groups: GroupRegistry::with_builtins(),
            archive: None,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_groups(mut self, groups: GroupRegistry) -> Self {
        self.groups = groups;
        self
    }

    /// Apply `filter` to every request on top of its own preset.
    pub fn with_archive_filter(mut self, filter: GroupConstraint) -> Self {
        self.archive = Some(filter);
        self
    }

    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    fn scoped(&self, preset: &GroupConstraint) -> GroupConstraint {
        match &self.archive {
            Some(archive) => compose([archive, preset]),
            None => preset.clone(),
        }
    }

    fn check_limit(&self, params: &RequestParams) -> Result<()> {
        if params.limit > self.max_limit {
            return Err(RegistryError::InvalidParameter {
                name: "limit".to_string(),
                message: format!(
                    "{} exceeds the maximum page size of {}",
                    params.limit, self.max_limit
                ),
            });
        }
        Ok(())
    }

    async fn context(
        &self,
        params: RequestParams,
        out_preset: &GroupConstraint,
        res_preset: &GroupConstraint,
        singular: bool,
    ) -> Result<RequestContext> {
        // singular lookups always fetch a fixed window of two
        if !singular {
            self.check_limit(&params)?;
        }
        let out_preset = self.scoped(out_preset);
        let res_preset = self.scoped(res_preset);
        RequestContext::build(
            self.backend.as_ref(),
            &self.formats,
            params,
            &out_preset,
            &res_preset,
            singular,
        )
        .await
    }

    /// Run one request with a single preset for both resolution and output.
    pub async fn resolve_and_query(
        &self,
        params: RequestParams,
        preset: &GroupConstraint,
        singular: bool,
    ) -> Result<NegotiatedResponse> {
        self.resolve_across(params, preset, preset, singular).await
    }

    /// Run one request whose identifier lives in `res_preset` while the
    /// results come from `out_preset`.
    pub async fn resolve_across(
        &self,
        params: RequestParams,
        out_preset: &GroupConstraint,
        res_preset: &GroupConstraint,
        singular: bool,
    ) -> Result<NegotiatedResponse> {
        let ctx = self.context(params, out_preset, res_preset, singular).await?;
        assemble(self.backend.as_ref(), &ctx).await?;
        ctx.into_response()
    }

    /// Plural search over all products.
    pub async fn search_products(&self, params: RequestParams) -> Result<NegotiatedResponse> {
        self.resolve_and_query(params, &GroupConstraint::empty(), false)
            .await
    }

    /// One product. The selector from `params` applies.
    pub async fn product(
        &self,
        identifier: &str,
        params: RequestParams,
    ) -> Result<NegotiatedResponse> {
        let params = RequestParams {
            identifier: identifier.to_string(),
            ..params
        };
        self.resolve_and_query(params, &GroupConstraint::empty(), true)
            .await
    }

    /// Every version of a product.
    pub async fn product_versions(
        &self,
        identifier: &str,
        params: RequestParams,
    ) -> Result<NegotiatedResponse> {
        let params = RequestParams {
            identifier: identifier.to_string(),
            selector: VersionSelector::All,
            ..params
        };
        self.resolve_and_query(params, &GroupConstraint::empty(), false)
            .await
    }

    /// Plural search inside a named group.
    pub async fn products_by_group(
        &self,
        group: &str,
        params: RequestParams,
    ) -> Result<NegotiatedResponse> {
        let preset = self.groups.lookup(group)?.clone();
        info!("searching group '{}'", group);
        self.resolve_and_query(params, &preset, false).await
    }

    /// Fetch a known page of lidvids, reporting the page's total.
    pub async fn products_by_lidvids(
        &self,
        params: RequestParams,
        page: &Pagination<String>,
    ) -> Result<NegotiatedResponse> {
        let params = RequestParams {
            identifier: String::new(),
            start: page.start,
            limit: page.limit,
            ..params
        };
        let ctx = self
            .context(params, &GroupConstraint::empty(), &GroupConstraint::empty(), false)
            .await?;
        assemble_batch(self.backend.as_ref(), &ctx, page).await?;
        ctx.into_response()
    }
}
