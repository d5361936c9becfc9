use std::sync::Once;

use metrics::{describe_counter, Unit};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "rivista_page_cache_hits_total",
            Unit::Count,
            "Total number of home feed response-cache hits."
        );
        describe_counter!(
            "rivista_page_cache_misses_total",
            Unit::Count,
            "Total number of home feed response-cache misses."
        );
        describe_counter!(
            "rivista_page_cache_clears_total",
            Unit::Count,
            "Total number of manual response-cache clears."
        );
        describe_counter!(
            "rivista_page_cache_evictions_total",
            Unit::Count,
            "Total number of cached pages evicted by the LRU bound."
        );
        describe_counter!(
            "rivista_posts_created_total",
            Unit::Count,
            "Total number of posts created."
        );
        describe_counter!(
            "rivista_comments_created_total",
            Unit::Count,
            "Total number of comments created."
        );
        describe_counter!(
            "rivista_follows_created_total",
            Unit::Count,
            "Total number of follow edges created."
        );
    });
}
