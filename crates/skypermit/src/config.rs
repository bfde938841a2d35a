//! Kernel configuration.

use serde::Deserialize;

use crate::error::{KernelError, Result};

/// Default upper bound on an uploaded flight-log document.
pub const DEFAULT_MAX_FLIGHT_LOG_BYTES: usize = 10 * 1024 * 1024;

/// Tunables for the [`Kernel`](crate::Kernel).
///
/// Every field has a default, so a partial document such as
/// `{"max_flight_log_bytes": 4096}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Largest flight-log document `submit_flight_log` accepts, in bytes.
    pub max_flight_log_bytes: usize,
    /// Whether the central administrator may file logs on an applicant's
    /// behalf. When false only the applicant may.
    pub allow_admin_log_submission: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_flight_log_bytes: DEFAULT_MAX_FLIGHT_LOG_BYTES,
            allow_admin_log_submission: true,
        }
    }
}

impl KernelConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| KernelError::Config(e.to_string()))
    }
}
