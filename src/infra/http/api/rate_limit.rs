//! Fixed-window request limiter backed by the shared KV cache.

use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::cache::{CacheClient, rate_limit_key};

pub const METRIC_RATE_LIMITED: &str = "gemstore_rate_limited_total";

const SOURCE: &str = "gemstore::http::rate_limit";

/// A route group's budget within the shared window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub prefix: &'static str,
    pub max_requests: u32,
}

impl RateLimitRule {
    pub const fn new(prefix: &'static str, max_requests: u32) -> Self {
        Self {
            prefix,
            max_requests,
        }
    }
}

/// The rules applied across the API surface.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRules {
    /// Applied to every write request.
    pub global: RateLimitRule,
    pub product: RateLimitRule,
    pub orders: RateLimitRule,
    pub auth: RateLimitRule,
}

impl RateLimitRules {
    pub fn new(max_requests: u32, product_max_requests: u32) -> Self {
        Self {
            global: RateLimitRule::new("api", max_requests),
            product: RateLimitRule::new("product", product_max_requests),
            orders: RateLimitRule::new("orders", max_requests),
            auth: RateLimitRule::new("auth", max_requests),
        }
    }
}

impl Default for RateLimitRules {
    fn default() -> Self {
        Self::new(15, 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { count: u64 },
    Limited { count: u64 },
    /// The counter could not be read; the request proceeds.
    Unchecked,
}

impl RateDecision {
    pub fn is_limited(self) -> bool {
        matches!(self, RateDecision::Limited { .. })
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: CacheClient,
    window: Duration,
}

impl RateLimiter {
    pub fn new(cache: CacheClient, window: Duration) -> Self {
        Self { cache, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    pub async fn check(&self, rule: RateLimitRule, client_ip: &str, path: &str) -> RateDecision {
        let key = rate_limit_key(rule.prefix, client_ip, path);
        match self.cache.hit_window(&key, self.window).await {
            Ok(count) if count > u64::from(rule.max_requests) => {
                counter!(METRIC_RATE_LIMITED, "prefix" => rule.prefix).increment(1);
                debug!(target: SOURCE, key = %key, count, limit = rule.max_requests, "request over budget");
                RateDecision::Limited { count }
            }
            Ok(count) => RateDecision::Allowed { count },
            Err(err) => {
                warn!(target: SOURCE, key = %key, error = %err, "rate limiter unavailable; allowing request");
                RateDecision::Unchecked
            }
        }
    }
}
