//! Per-request state.
//!
//! A [`RequestContext`] is built once from [`RequestParams`], after format
//! negotiation, query parsing and identifier resolution, and is read-only afterwards. The
//! only late write is the response payload, which may be stored once.

use std::sync::OnceLock;
use std::time::Instant;

use serde::Serialize;
use tracing::warn;

use crate::backend::SearchBackend;
use crate::constraint::{compose, GroupConstraint};
use crate::error::{RegistryError, Result};
use crate::format::{FormatDescriptor, FormatRegistry, Strategy};
use crate::identifiers::{ProductIdentifier, VersionSelector};
use crate::negotiate::negotiate;
use crate::query::{parse_query, Clause, QueryBuilder, SearchQuery};
use crate::resolve::{resolve, ResolutionScope};
use crate::response::ResultPayload;

pub const DEFAULT_LIMIT: usize = 100;

/// Raw request inputs as received from a transport.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub identifier: String,
    pub selector: VersionSelector,
    pub query: String,
    pub keywords: Vec<String>,
    pub fields: Vec<String>,
    pub start: usize,
    pub limit: usize,
    pub sort: Vec<String>,
    pub accept: String,
    /// Return only the summary and the unique property names.
    pub summary_only: bool,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            selector: VersionSelector::default(),
            query: String::new(),
            keywords: Vec::new(),
            fields: Vec::new(),
            start: 0,
            limit: DEFAULT_LIMIT,
            sort: Vec::new(),
            accept: "*/*".to_string(),
            summary_only: false,
        }
    }
}

impl RequestParams {
    pub fn for_identifier(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }
}

/// A page of items with its position in a larger, already known result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination<T> {
    pub items: Vec<T>,
    pub start: usize,
    pub limit: usize,
    /// Size of the whole result the page was cut from.
    pub total: u64,
}

impl<T> Pagination<T> {
    pub fn new(items: Vec<T>, start: usize, limit: usize, total: u64) -> Self {
        Self {
            items,
            start,
            limit,
            total,
        }
    }
}

/// Final, format-tagged result of a request.
#[derive(Debug, Clone, Serialize)]
pub struct NegotiatedResponse {
    pub mime: String,
    pub strategy: Strategy,
    pub payload: ResultPayload,
}

/// Immutable state of one request.
#[derive(Debug)]
pub struct RequestContext {
    begin: Instant,
    query_string: String,
    query: Option<Clause>,
    keywords: Vec<String>,
    requested: Option<ProductIdentifier>,
    identifier: Option<ProductIdentifier>,
    format: FormatDescriptor,
    fields: Vec<String>,
    start: usize,
    limit: usize,
    sort: Vec<String>,
    preset: GroupConstraint,
    selector: VersionSelector,
    singular: bool,
    summary_only: bool,
    response: OnceLock<ResultPayload>,
}

impl RequestContext {
    /// Negotiate the format, compute the field set, parse `q`, then resolve
    /// the identifier. Nothing reaches the backend before `q` parses.
    ///
    /// `out_preset` restricts the documents returned; `res_preset` restricts
    /// the versions visible to identifier resolution. When they differ the
    /// request crosses groups and resolution is forced to `Typed`.
    pub async fn build<B>(
        backend: &B,
        formats: &FormatRegistry,
        params: RequestParams,
        out_preset: &GroupConstraint,
        res_preset: &GroupConstraint,
        singular: bool,
    ) -> Result<Self>
    where
        B: SearchBackend + ?Sized,
    {
        let begin = Instant::now();
        let negotiated = negotiate(formats, &params.accept, &params.fields)?;
        let query = parse_query(&params.query)?;
        let requested = ProductIdentifier::parse(&params.identifier)?;

        let resolution_selector = if out_preset == res_preset {
            params.selector
        } else {
            VersionSelector::Typed
        };
        let identifier = resolve(
            backend,
            requested.as_ref(),
            resolution_selector,
            ResolutionScope {
                constraint: res_preset,
                fields: &negotiated.fields,
            },
        )
        .await?;

        Ok(Self {
            begin,
            query_string: params.query,
            query,
            keywords: params.keywords,
            requested,
            identifier,
            format: negotiated.descriptor,
            fields: negotiated.fields,
            start: params.start,
            limit: params.limit,
            sort: params.sort,
            preset: out_preset.clone(),
            selector: params.selector,
            singular,
            summary_only: params.summary_only,
            response: OnceLock::new(),
        })
    }

    /// True when only the unsuperseded version may match: the selector is
    /// `Latest` and the caller gave no explicit version.
    pub fn just_latest(&self) -> bool {
        self.selector == VersionSelector::Latest
            && !self
                .requested
                .as_ref()
                .is_some_and(ProductIdentifier::is_versioned)
    }

    /// Output preset combined with the identifier constraint.
    pub fn constraint(&self) -> GroupConstraint {
        match &self.identifier {
            Some(identifier) => {
                let implied = GroupConstraint::for_identifier(identifier);
                compose([&self.preset, &implied])
            }
            None => self.preset.clone(),
        }
    }

    /// Backend query for the plural window of this request.
    pub fn build_query(&self) -> SearchQuery {
        QueryBuilder::new(self.constraint())
            .clause(self.query.clone())
            .keywords(&self.keywords)
            .just_latest(self.just_latest())
            .fields(&self.fields)
            .window(self.start, self.limit)
            .sort(&self.sort)
            .build()
    }

    pub fn identifier(&self) -> Option<&ProductIdentifier> {
        self.identifier.as_ref()
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn sort(&self) -> &[String] {
        &self.sort
    }

    pub fn selector(&self) -> VersionSelector {
        self.selector
    }

    pub fn is_singular(&self) -> bool {
        self.singular
    }

    pub fn is_summary_only(&self) -> bool {
        self.summary_only
    }

    /// Milliseconds since the context was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.begin.elapsed().as_millis() as u64
    }

    /// Store the payload. Later calls are ignored.
    pub fn set_response(&self, payload: ResultPayload) {
        if self.response.set(payload).is_err() {
            warn!("response already set for this request, keeping the first one");
        }
    }

    pub fn response(&self) -> Option<&ResultPayload> {
        self.response.get()
    }

    /// Log the conditions of a request that produced nothing.
    pub fn log_conditions(&self) {
        warn!(
            "Could not find any data given these conditions: identifier={}, selector={}, \
             q='{}', keywords={:?}, fields={:?}, start={}, limit={}, format={}",
            self.identifier
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            self.selector,
            self.query_string,
            self.keywords,
            self.fields,
            self.start,
            self.limit,
            self.format.mime,
        );
    }

    /// Consume the context into the final response.
    pub fn into_response(self) -> Result<NegotiatedResponse> {
        let payload = self.response.into_inner().ok_or(RegistryError::NothingFound)?;
        Ok(NegotiatedResponse {
            mime: self.format.mime,
            strategy: self.format.strategy,
            payload,
        })
    }
}
