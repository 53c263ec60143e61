//! Logging bootstrap for applications embedding calbridge.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "info";

/// Install a global fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Fails if a global subscriber is already installed.
pub fn init() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set up logging: {}", e))?;

    Ok(())
}
