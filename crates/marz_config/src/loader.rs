//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::MarzConfig;
use std::path::Path;

/// Loads and validates a `marz.toml` configuration from a directory.
///
/// Reads `<dir>/marz.toml`, parses it, and validates the cache settings.
pub fn load_config(dir: &Path) -> Result<MarzConfig, ConfigError> {
    let config_path = dir.join("marz.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `marz.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<MarzConfig, ConfigError> {
    let config: MarzConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &MarzConfig) -> Result<(), ConfigError> {
    if config.cache.max_entries == 0 {
        return Err(ConfigError::ValidationError(
            "cache.max_entries must be greater than zero".to_string(),
        ));
    }
    if config.cache.staleness_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.staleness_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
