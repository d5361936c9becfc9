//! Response cache middleware for the home feed.
//!
//! Caches GET responses that return 200 OK and serves them until the TTL
//! lapses or the cache is cleared.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use super::{config::PageCacheConfig, keys::PageKey, store::CachedPage, store::PageStore};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Shared cache state for the middleware and the clear endpoint.
#[derive(Clone)]
pub struct CacheState {
    pub config: PageCacheConfig,
    pub store: Arc<PageStore>,
}

impl CacheState {
    pub fn new(config: PageCacheConfig) -> Self {
        let store = Arc::new(PageStore::new(&config));
        Self { config, store }
    }
}

/// Serve cached pages, or run the handler and cache its 200 response.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled {
        return next.run(request).await;
    }
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("");
    let key = PageKey::new(&path, query);

    if let Some(cached) = cache.store.get(&key) {
        debug!(cache = "page", outcome = "hit", "serving cached response");
        metrics::counter!("rivista_page_cache_hits_total").increment(1);
        return build_response(cached);
    }

    debug!(cache = "page", outcome = "miss", "executing handler");
    metrics::counter!("rivista_page_cache_misses_total").increment(1);

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            // Body larger than the cache limit; hand back an error rather
            // than a truncated page.
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedPage::new(
        parts.status.as_u16(),
        parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect(),
        bytes.clone(),
    );
    cache.store.set(key, cached);

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedPage) -> Response {
    use axum::http::HeaderValue;

    let mut builder = Response::builder().status(cached.status);
    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }
    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
