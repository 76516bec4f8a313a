//! Client configuration loader
//!
//! Locations in priority order:
//! 1. ./.spellbridge.toml (project-specific)
//! 2. $SPELLBRIDGE_CONFIG (environment variable)
//! 3. ~/.config/spellbridge/config.toml (user-global)

use std::path::PathBuf;

use tracing::debug;

use crate::config::UserConfig;
use crate::types::{ClientError, Result};

pub fn load_user_config() -> Result<Option<UserConfig>> {
    let mut candidates = Vec::new();

    // Project-specific config
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(".spellbridge.toml"));
    }

    // Environment variable
    if let Ok(config_path) = std::env::var("SPELLBRIDGE_CONFIG") {
        candidates.push(PathBuf::from(config_path));
    }

    // User-global config
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("spellbridge").join("config.toml"));
    }

    for path in &candidates {
        if path.exists() {
            debug!("Loading user config from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .map_err(|e| ClientError::ConfigError(format!("Failed to read config: {e}")))?;

            let config: UserConfig = toml::from_str(&content)
                .map_err(|e| ClientError::ConfigError(format!("Failed to parse config: {e}")))?;

            return Ok(Some(config));
        }
    }

    debug!("No user config file found");
    Ok(None)
}
