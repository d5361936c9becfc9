//! Rendered-page caching for the home feed.
//!
//! Cached responses are keyed by path and query string, served until the
//! configured TTL lapses, and can be dropped wholesale through the manual
//! clear endpoint.
//!
//! ```toml
//! [cache]
//! enabled = true
//! response_limit = 128
//! ttl_secs = 20
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::PageCacheConfig;
pub use keys::PageKey;
pub use middleware::{response_cache_layer, CacheState};
pub use store::{CachedPage, PageStore};
