use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    middleware,
    routing::get,
};
use http_body_util::BodyExt;
use metrics_util::debugging::DebuggingRecorder;
use rivista::cache::{CacheState, PageCacheConfig, response_cache_layer};
use serial_test::serial;
use tower::ServiceExt;

fn counting_router(cache: CacheState, calls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/",
            get(move || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::OK, format!("render {n}"))
                }
            }),
        )
        .layer(middleware::from_fn_with_state(cache, response_cache_layer))
}

fn cache_with_ttl(ttl_secs: u64) -> CacheState {
    CacheState::new(PageCacheConfig {
        enabled: true,
        response_limit: 8,
        ttl_secs,
    })
}

async fn get_body(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn repeated_requests_are_served_from_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = counting_router(cache_with_ttl(60), Arc::clone(&calls));

    let (status, first) = get_body(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = get_body(&app, "/").await;
    let (_, third) = get_body(&app, "/").await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[tokio::test]
async fn query_string_distinguishes_cache_entries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = counting_router(cache_with_ttl(60), Arc::clone(&calls));

    let (_, page_one) = get_body(&app, "/").await;
    let (_, page_two) = get_body(&app, "/?page=2").await;
    let (_, page_one_again) = get_body(&app, "/").await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_ne!(page_one, page_two);
    assert_eq!(page_one, page_one_again);
}

#[tokio::test]
async fn zero_ttl_expires_entries_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = counting_router(cache_with_ttl(0), Arc::clone(&calls));

    get_body(&app, "/").await;
    get_body(&app, "/").await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn disabled_cache_always_runs_the_handler() {
    let cache = CacheState::new(PageCacheConfig {
        enabled: false,
        ..Default::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let app = counting_router(cache, Arc::clone(&calls));

    get_body(&app, "/").await;
    get_body(&app, "/").await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn error_responses_are_not_cached() {
    let cache = cache_with_ttl(60);
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let app = Router::new()
        .route(
            "/",
            get(move || {
                let calls = Arc::clone(&handler_calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NOT_FOUND
                }
            }),
        )
        .layer(middleware::from_fn_with_state(
            cache.clone(),
            response_cache_layer,
        ));

    get_body(&app, "/").await;
    get_body(&app, "/").await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.store.is_empty());
}

#[tokio::test]
async fn manual_clear_forces_a_fresh_render() {
    let cache = cache_with_ttl(60);
    let calls = Arc::new(AtomicUsize::new(0));
    let app = counting_router(cache.clone(), Arc::clone(&calls));

    get_body(&app, "/").await;
    get_body(&app, "/").await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.store.clear();

    get_body(&app, "/").await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn post_requests_bypass_the_cache() {
    let cache = cache_with_ttl(60);
    let app = Router::new()
        .route("/", get(|| async { StatusCode::OK }))
        .layer(middleware::from_fn_with_state(
            cache.clone(),
            response_cache_layer,
        ));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .body(Body::empty())
        .expect("request should build");
    let _ = app.oneshot(request).await.expect("router should respond");

    assert!(cache.store.is_empty());
}

// The debugging recorder installs globally, so this test runs alone.
#[tokio::test]
#[serial]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let calls = Arc::new(AtomicUsize::new(0));
    let app = counting_router(cache_with_ttl(60), calls);

    get_body(&app, "/").await;
    get_body(&app, "/").await;
    metrics::counter!("rivista_page_cache_clears_total").increment(1);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        "rivista_page_cache_hits_total",
        "rivista_page_cache_misses_total",
        "rivista_page_cache_clears_total",
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
