//! Configuration schema: the runtime tuning knobs this framework actually
//! exposes, per spec.md's Non-goals (no provider/framework selection —
//! those concepts don't exist in an in-process test runner).

use serde::{Deserialize, Serialize};

fn default_timeout_secs() -> f64 {
    60.0
}

fn default_waiter_slice_millis() -> u64 {
    100
}

/// Root configuration structure, loaded from an optional `testframe.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub waiter: WaiterConfig,
}

/// Tuning for [`crate::waiter::Waiter`]: the default timeout applied when
/// a test doesn't specify one, and the suspension slice ceiling described
/// in spec.md §4.E / §9 (the 100ms cap on each `Condvar::wait_timeout`
/// call).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaiterConfig {
    /// Default timeout, in seconds, for a `wait()` call that doesn't
    /// specify its own.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: f64,

    /// Upper bound, in milliseconds, on each cooperative suspension slice.
    /// Lower values make a timed-out wait notice sooner at the cost of
    /// more frequent wakeups; the spec requires this to be "≤ 100ms" and
    /// that is the default.
    #[serde(default = "default_waiter_slice_millis")]
    pub suspension_slice_millis: u64,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            suspension_slice_millis: default_waiter_slice_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_spec_documented_values() {
        let config = Config::default();
        assert_eq!(config.waiter.default_timeout_secs, 60.0);
        assert_eq!(config.waiter.suspension_slice_millis, 100);
    }

    #[test]
    fn partial_toml_fills_in_missing_fields_with_defaults() {
        let config: Config = toml::from_str("[waiter]\ndefault_timeout_secs = 5.0\n").unwrap();
        assert_eq!(config.waiter.default_timeout_secs, 5.0);
        assert_eq!(config.waiter.suspension_slice_millis, 100);
    }
}
