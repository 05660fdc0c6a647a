//! Runtime configuration for the component runtime.
//!
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use std::env;

/// Fresh-children count at which the child differ switches to one bulk write.
pub const DEFAULT_BULK_THRESHOLD: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiConfig {
    /// A parent whose new children are all fresh and at least this many is
    /// filled with a single content write instead of per-child inserts.
    pub bulk_threshold: usize,
    /// Fail (rather than warn and replace) when hydrating a regular container
    /// whose server checksum does not match. Document targets are always strict.
    pub strict_hydration: bool,
    /// Log reconcile counters after each flush.
    pub telemetry_enabled: bool,
}

impl UiConfig {
    /// Construct a config with explicit values. `bulk_threshold` is clamped to at least 1.
    #[must_use]
    pub const fn new(bulk_threshold: usize, strict_hydration: bool, telemetry_enabled: bool) -> Self {
        let bulk_threshold = if bulk_threshold < 1 { 1 } else { bulk_threshold };
        Self {
            bulk_threshold,
            strict_hydration,
            telemetry_enabled,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `VALOR_UI_BULK_THRESHOLD`: bulk child insertion threshold (default: 8, minimum 1)
    /// - `VALOR_UI_STRICT_HYDRATION`: set to "0" to replace mismatched server markup (default: strict)
    /// - `VALOR_UI_TELEMETRY`: set to "1" to log reconcile counters (default: disabled)
    #[must_use]
    pub fn from_env() -> Self {
        let bulk_threshold = env::var("VALOR_UI_BULK_THRESHOLD")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_BULK_THRESHOLD)
            .max(1);
        let strict_hydration = env::var("VALOR_UI_STRICT_HYDRATION").ok().as_deref() != Some("0");
        let telemetry_enabled = env::var("VALOR_UI_TELEMETRY").ok().as_deref() == Some("1");
        Self {
            bulk_threshold,
            strict_hydration,
            telemetry_enabled,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
