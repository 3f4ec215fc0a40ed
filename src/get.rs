//! Single product retrieval from the command line.
//!
//! Mirrors `GET /products/{identifier}` (singular) and
//! `GET /products/{identifier}/all` (every version).

use std::io::Write;

use anyhow::Result;

use pds_registry_core::identifiers::VersionSelector;
use pds_registry_core::RequestParams;

use crate::config::Config;
use crate::index::open_registry;
use crate::render::render;

pub async fn run_get(
    config: &Config,
    identifier: &str,
    selector: VersionSelector,
    fields: Vec<String>,
    accept: String,
) -> Result<()> {
    let (registry, _) = open_registry(config)?;
    let params = RequestParams {
        selector,
        fields,
        accept,
        limit: config.registry.default_limit,
        ..Default::default()
    };

    let response = match selector {
        VersionSelector::All => registry.product_versions(identifier, params).await?,
        VersionSelector::Latest | VersionSelector::Typed => {
            registry.product(identifier, params).await?
        }
    };

    let body = render(&response.payload, &response.mime)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.write_all(b"\n")?;
    Ok(())
}
