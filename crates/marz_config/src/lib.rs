//! Parsing and validation of `marz.toml` workbench configuration.
//!
//! The memoization cache ships with hardcoded defaults; this crate lets a
//! deployment override them from a `[cache]` table.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::{CacheSettings, MarzConfig};
