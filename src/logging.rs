//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the `[log] level` from the config
//! applies to this crate and the pipeline core.

use anyhow::Result;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter directives for a configured level.
pub fn directives(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!("warn,pds_registry={level},pds_registry_core={level}")
}

/// Install the global subscriber. Logs go to stderr so CLI output on
/// stdout stays machine-readable.
pub fn init(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(level)))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_cover_both_crates() {
        let d = directives("DEBUG");
        assert!(d.contains("pds_registry=debug"));
        assert!(d.contains("pds_registry_core=debug"));
        assert!(EnvFilter::try_new(d).is_ok());
    }
}
