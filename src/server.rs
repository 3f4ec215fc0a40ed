//! HTTP API server.
//!
//! Exposes the registry pipeline over HTTP. Every product route negotiates
//! its response format from the `Accept` header.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (version and index size) |
//! | `GET`  | `/products` | Search all products |
//! | `GET`  | `/products/{identifier}` | One product, latest version unless a vid is given |
//! | `GET`  | `/products/{identifier}/latest` | Latest version of a product |
//! | `GET`  | `/products/{identifier}/all` | Every version of a product |
//! | `GET`  | `/classes/{group}` | Search inside a named group |
//! | `GET`  | `/formats` | Supported media types |
//!
//! Search parameters: `q`, `keywords`, `fields`, `start`, `limit`, `sort`,
//! `only-summary`. List parameters are comma-separated.
//!
//! # Error Contract
//!
//! ```json
//! { "request": "/products/urn:nasa:pds:x", "message": "could not find lid(vid) in the registry: urn:nasa:pds:x" }
//! ```
//!
//! Status codes: 400 (bad parameters, unknown group, malformed query),
//! 404 (unknown identifier, no match), 406 (unsupported Accept), 500
//! (backend failure, ambiguous singular result).

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use pds_registry_core::identifiers::VersionSelector;
use pds_registry_core::negotiate::find_match;
use pds_registry_core::{ErrorKind, NegotiatedResponse, Registry, RegistryError, RequestParams};

use crate::config::Config;
use crate::index::{open_registry, IndexInfo};
use crate::render::{render, render_error, Encoding, ErrorMessage};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    index: Arc<IndexInfo>,
    default_limit: usize,
}

/// Loads the index and serves the API on `[server].bind` until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let (registry, index) = open_registry(config)?;
    let state = AppState {
        registry: Arc::new(registry),
        index: Arc::new(index),
        default_limit: config.registry.default_limit,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("registry API listening on http://{}", config.server.bind);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/formats", get(handle_formats))
        .route("/products", get(handle_products))
        .route("/products/{identifier}", get(handle_product))
        .route("/products/{identifier}/latest", get(handle_product))
        .route("/products/{identifier}/all", get(handle_product_versions))
        .route("/classes/{group}", get(handle_group))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// Error that renders in the client's negotiated format.
struct AppError {
    status: StatusCode,
    mime: String,
    body: ErrorMessage,
}

impl AppError {
    fn from_registry(err: RegistryError, request: &str, mime: &str) -> Self {
        let status = match err.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // a rejected Accept value cannot be used for the error body itself
        let mime = match err {
            RegistryError::UnsupportedFormat { .. } => "application/json",
            _ => mime,
        };
        if status.is_server_error() {
            error!("request {} failed: {}", request, err);
        }
        Self {
            status,
            mime: mime.to_string(),
            body: ErrorMessage {
                request: request.to_string(),
                message: err.to_string(),
            },
        }
    }

    fn internal(request: &str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            mime: "application/json".to_string(),
            body: ErrorMessage {
                request: request.to_string(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let encoding = Encoding::for_mime(&self.mime);
        match render_error(&self.body, &self.mime) {
            Ok(bytes) => (
                self.status,
                [(header::CONTENT_TYPE, encoding.content_type(&self.mime))],
                bytes,
            )
                .into_response(),
            Err(_) => (self.status, Json(self.body)).into_response(),
        }
    }
}

// ============ Request plumbing ============

/// Query-string parameters shared by the product routes.
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    keywords: Option<String>,
    fields: Option<String>,
    start: Option<usize>,
    limit: Option<usize>,
    sort: Option<String>,
    #[serde(rename = "only-summary")]
    only_summary: Option<bool>,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn accept_header(headers: &HeaderMap) -> String {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("*/*")
        .to_string()
}

/// Per-request inputs common to every product handler.
struct Call {
    request: String,
    accept: String,
    error_mime: String,
    params: RequestParams,
}

impl Call {
    fn new(state: &AppState, uri: &OriginalUri, headers: &HeaderMap, search: SearchParams) -> Self {
        let accept = accept_header(headers);
        let error_mime = find_match(state.registry.formats(), &accept);
        let params = RequestParams {
            query: search.q.unwrap_or_default(),
            keywords: split_list(search.keywords.as_deref()),
            fields: split_list(search.fields.as_deref()),
            start: search.start.unwrap_or(0),
            limit: search.limit.unwrap_or(state.default_limit),
            sort: split_list(search.sort.as_deref()),
            accept: accept.clone(),
            summary_only: search.only_summary.unwrap_or(false),
            ..Default::default()
        };
        Self {
            request: uri.0.to_string(),
            accept,
            error_mime,
            params,
        }
    }

    fn finish(&self, result: pds_registry_core::Result<NegotiatedResponse>) -> Result<Response, AppError> {
        let response = result
            .map_err(|err| AppError::from_registry(err, &self.request, &self.error_mime))?;
        let bytes = render(&response.payload, &response.mime)
            .map_err(|err| AppError::internal(&self.request, err.to_string()))?;
        let content_type = Encoding::for_mime(&response.mime).content_type(&response.mime);
        info!(
            "{} -> {} ({} bytes, accept '{}')",
            self.request,
            content_type,
            bytes.len(),
            self.accept
        );
        Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
    index: IndexInfo,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index: state.index.as_ref().clone(),
    })
}

// ============ GET /formats ============

#[derive(Serialize)]
struct FormatsResponse {
    formats: Vec<String>,
}

async fn handle_formats(State(state): State<AppState>) -> Json<FormatsResponse> {
    Json(FormatsResponse {
        formats: state.registry.formats().supported(),
    })
}

// ============ Product routes ============

async fn handle_products(
    State(state): State<AppState>,
    uri: OriginalUri,
    headers: HeaderMap,
    Query(search): Query<SearchParams>,
) -> Result<Response, AppError> {
    let call = Call::new(&state, &uri, &headers, search);
    let result = state.registry.search_products(call.params.clone()).await;
    call.finish(result)
}

async fn handle_product(
    State(state): State<AppState>,
    uri: OriginalUri,
    headers: HeaderMap,
    Path(identifier): Path<String>,
    Query(search): Query<SearchParams>,
) -> Result<Response, AppError> {
    let call = Call::new(&state, &uri, &headers, search);
    let params = RequestParams {
        selector: VersionSelector::Latest,
        ..call.params.clone()
    };
    let result = state.registry.product(&identifier, params).await;
    call.finish(result)
}

async fn handle_product_versions(
    State(state): State<AppState>,
    uri: OriginalUri,
    headers: HeaderMap,
    Path(identifier): Path<String>,
    Query(search): Query<SearchParams>,
) -> Result<Response, AppError> {
    let call = Call::new(&state, &uri, &headers, search);
    let result = state
        .registry
        .product_versions(&identifier, call.params.clone())
        .await;
    call.finish(result)
}

async fn handle_group(
    State(state): State<AppState>,
    uri: OriginalUri,
    headers: HeaderMap,
    Path(group): Path<String>,
    Query(search): Query<SearchParams>,
) -> Result<Response, AppError> {
    let call = Call::new(&state, &uri, &headers, search);
    let result = state
        .registry
        .products_by_group(&group, call.params.clone())
        .await;
    call.finish(result)
}
