//! Configuration loading for `testframe`.
//!
//! The core described in spec.md takes no configuration at all — every
//! knob here is ambient runtime tuning (waiter timeout, suspension slice)
//! that the CLI driver loads once at startup and threads through to the
//! engine, following the same `toml` + `serde` loader split the teacher
//! crate uses for its own (considerably larger) configuration surface.

pub mod schema;

pub use schema::{Config, WaiterConfig};

use anyhow::{Context, Result};
use std::path::Path;

/// Loads configuration from a TOML file. Missing fields fall back to
/// their documented defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    load_config_str(&content)
}

/// Loads configuration from a TOML string.
pub fn load_config_str(content: &str) -> Result<Config> {
    toml::from_str(content).context("failed to parse config")
}

/// Loads `path` if it exists, otherwise returns the default configuration
/// — a `testframe.toml` is entirely optional.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}
