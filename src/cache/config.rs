//! Page cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_RESPONSE_LIMIT: usize = 128;
const DEFAULT_TTL_SECS: u64 = 20;

/// Settings for the rendered-page response cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageCacheConfig {
    /// Enable the response cache on the home feed.
    pub enabled: bool,
    /// Maximum cached responses before LRU eviction.
    pub response_limit: usize,
    /// Seconds a cached response stays servable.
    pub ttl_secs: u64,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            response_limit: DEFAULT_RESPONSE_LIMIT,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for PageCacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            response_limit: settings.response_limit,
            ttl_secs: settings.ttl_secs,
        }
    }
}

impl PageCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
