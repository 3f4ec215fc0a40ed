//! # PDS Registry CLI (`pds-registry`)
//!
//! ## Usage
//!
//! ```bash
//! pds-registry --config ./config/registry.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pds-registry serve` | Start the HTTP API |
//! | `pds-registry search [q]` | Search products |
//! | `pds-registry get <identifier>` | Fetch one product (or every version with `--selector all`) |
//! | `pds-registry formats` | List supported media types |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pds_registry::search::SearchOptions;
use pds_registry::{config, formats, get, logging, search, server};
use pds_registry_core::identifiers::VersionSelector;

/// PDS Registry: search and retrieval API for planetary data products.
#[derive(Parser)]
#[command(name = "pds-registry", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/registry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Search products and print the rendered result.
    Search {
        /// Query expression, e.g. `title like "*mars*" and vid ge 2.0`.
        #[arg(default_value = "")]
        query: String,

        /// Restrict to a named group (`bundles`, `collections`, `products`, ...).
        #[arg(long)]
        group: Option<String>,

        /// Free-text keywords, all of which must match.
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Properties to return, in dotted notation.
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Page size (defaults to `[registry].default_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Sort keys; prefix with `-` for descending.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        sort: Vec<String>,

        /// Output media type.
        #[arg(long, default_value = "application/json")]
        accept: String,

        /// Print only the summary with the unique property names.
        #[arg(long)]
        summary_only: bool,
    },

    /// Fetch a product by lid or lidvid.
    Get {
        identifier: String,

        /// `latest`, `all` or `typed`.
        #[arg(long, default_value = "latest")]
        selector: VersionSelector,

        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long, default_value = "application/json")]
        accept: String,
    },

    /// List supported media types.
    Formats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Formats = cli.command {
        return formats::list_formats();
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.log.level)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Search {
            query,
            group,
            keywords,
            fields,
            start,
            limit,
            sort,
            accept,
            summary_only,
        } => {
            search::run_search(
                &cfg,
                SearchOptions {
                    query,
                    group,
                    keywords,
                    fields,
                    start,
                    limit,
                    sort,
                    accept,
                    summary_only,
                },
            )
            .await?;
        }
        Commands::Get {
            identifier,
            selector,
            fields,
            accept,
        } => {
            get::run_get(&cfg, &identifier, selector, fields, accept).await?;
        }
        Commands::Formats => unreachable!("handled before config loading"),
    }

    Ok(())
}
