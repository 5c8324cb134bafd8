mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./tunerelay.toml",
        "~/.config/tunerelay/config.toml",
        "/etc/tunerelay/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if !config.catalog.base_url.is_empty() {
        if config.catalog.client_id.is_empty() || config.catalog.client_secret.is_empty() {
            anyhow::bail!("Catalog is configured but has no client credentials");
        }
        if config.catalog.token_url.is_empty() {
            anyhow::bail!("Catalog is configured but has no token URL");
        }
    }

    Ok(())
}

/// Check that every upstream a running server needs is configured.
/// Split from [`validate_config`] so `validate` can accept a partial file.
pub fn require_upstreams(config: &Config) -> Result<()> {
    if config.catalog.base_url.is_empty() {
        anyhow::bail!("catalog.base_url is required to start the server");
    }
    if config.search.base_url.is_empty() {
        anyhow::bail!("search.base_url is required to start the server");
    }
    if config.resolver.base_url.is_empty() {
        anyhow::bail!("resolver.base_url is required to start the server");
    }
    Ok(())
}
