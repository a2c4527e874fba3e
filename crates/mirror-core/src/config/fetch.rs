//! Fetch tuning section

use std::time::Duration;

use mirror_fetch::FetchOptions;
use serde::{Deserialize, Serialize};

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_retry_delay_ms() -> u64 {
    250
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

fn default_concurrency() -> usize {
    4
}

/// `[fetch]` section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchSettings {
    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled for each later one
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Maximum requests in flight per domain
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            concurrency: default_concurrency(),
        }
    }
}

impl FetchSettings {
    pub fn to_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            base_retry_delay: Duration::from_millis(self.base_retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
            concurrency: self.concurrency,
        }
    }
}
