pub mod config;
pub mod error;

pub use config::{ApiConfig, CacheConfig, Config, ValidationResult};
pub use error::ConfigError;

use anyhow::Result;

/// Initialize logging for binaries built on the Zermelo client
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!("Zermelo core initialized");
    Ok(())
}
