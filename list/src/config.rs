use crate::error::ConfigError;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// Timing knobs of a list controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Coalescing window for debounced facets (free text).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// A request without a response after this long fails with a timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ListConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.debounce_ms >= self.request_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "debounce_ms ({}) must be shorter than request_timeout_ms ({})",
                self.debounce_ms, self.request_timeout_ms
            )));
        }
        Ok(())
    }
}
