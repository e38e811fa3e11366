use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names;
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::METRIC_RATE_LIMITED;

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
            metric_names::METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of response-cache hits."
        );
        describe_counter!(
            metric_names::METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of response-cache misses."
        );
        describe_counter!(
            metric_names::METRIC_CACHE_UNAVAILABLE,
            Unit::Count,
            "Cache operations that failed or timed out, labelled by op."
        );
        describe_counter!(
            metric_names::METRIC_INVALIDATED_KEYS,
            Unit::Count,
            "Total number of cache keys deleted by invalidation."
        );
        describe_histogram!(
            metric_names::METRIC_INVALIDATE_MS,
            Unit::Milliseconds,
            "Invalidation latency in milliseconds."
        );
        describe_counter!(
            METRIC_RATE_LIMITED,
            Unit::Count,
            "Requests rejected by the rate limiter, labelled by route prefix."
        );
    });
}
