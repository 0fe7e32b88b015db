//! Configuration types deserialized from `marz.toml`.

use serde::Deserialize;
use std::time::Duration;

/// The top-level workbench configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarzConfig {
    /// Memoization cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Settings of the process-wide memoization cache.
///
/// These are read once when the cache is constructed and never change
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheSettings {
    /// Whether memoization is active. When `false`, wrapped computations
    /// always run and explicit lookups always miss.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Entry count at which the next access triggers a staleness sweep.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Maximum age, in seconds since the last write, an entry survives a sweep.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
}

fn default_enabled() -> bool {
    true
}
fn default_max_entries() -> usize {
    1024
}
fn default_staleness_secs() -> u64 {
    300
} // 5 minutes

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_entries: default_max_entries(),
            staleness_secs: default_staleness_secs(),
        }
    }
}

impl CacheSettings {
    /// Settings with caching turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Staleness window as a [`Duration`].
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = CacheSettings::default();
        assert!(s.enabled);
        assert_eq!(s.max_entries, 1024);
        assert_eq!(s.staleness(), Duration::from_secs(300));
    }

    #[test]
    fn disabled_keeps_other_defaults() {
        let s = CacheSettings::disabled();
        assert!(!s.enabled);
        assert_eq!(s.max_entries, 1024);
    }

    #[test]
    fn missing_cache_table_uses_defaults() {
        let config: MarzConfig = toml::from_str("").unwrap();
        assert_eq!(config.cache, CacheSettings::default());
    }
}
