//! Product search from the command line.
//!
//! Runs the same pipeline as `GET /products` (or `GET /classes/{group}` when
//! a group is given) and writes the rendered body to stdout.

use std::io::Write;

use anyhow::Result;

use pds_registry_core::RequestParams;

use crate::config::Config;
use crate::index::open_registry;
use crate::render::render;

/// Options for `pds-registry search`.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub query: String,
    pub group: Option<String>,
    pub keywords: Vec<String>,
    pub fields: Vec<String>,
    pub start: usize,
    pub limit: Option<usize>,
    pub sort: Vec<String>,
    pub accept: String,
    pub summary_only: bool,
}

pub async fn run_search(config: &Config, options: SearchOptions) -> Result<()> {
    let (registry, _) = open_registry(config)?;
    let params = RequestParams {
        query: options.query,
        keywords: options.keywords,
        fields: options.fields,
        start: options.start,
        limit: options.limit.unwrap_or(config.registry.default_limit),
        sort: options.sort,
        accept: options.accept,
        summary_only: options.summary_only,
        ..Default::default()
    };

    let response = match &options.group {
        Some(group) => registry.products_by_group(group, params).await?,
        None => registry.search_products(params).await?,
    };

    let body = render(&response.payload, &response.mime)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.write_all(b"\n")?;
    Ok(())
}
