use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters for the entropy pool. All counters only grow until
/// `reset` is called.
#[derive(Debug, Default)]
pub struct EntropyMetrics {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    api_calls: AtomicU64,
    api_failures: AtomicU64,
    fallback_used: AtomicU64,
}

impl EntropyMetrics {
    pub(crate) fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_api_failure(&self) {
        self.api_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.fallback_used.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.total_requests,
            &self.cache_hits,
            &self.cache_misses,
            &self.api_calls,
            &self.api_failures,
            &self.fallback_used,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self, pool_size: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            api_failures: self.api_failures.load(Ordering::Relaxed),
            fallback_used: self.fallback_used.load(Ordering::Relaxed),
            pool_size,
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub api_calls: u64,
    pub api_failures: u64,
    pub fallback_used: u64,
    #[serde(rename = "cacheSize")]
    pub pool_size: usize,
}

impl MetricsSnapshot {
    /// Percentage of requests served straight from the pool.
    pub fn cache_hit_rate(&self) -> f64 {
        percentage(self.cache_hits, self.total_requests)
    }

    /// Percentage of remote fetches that succeeded.
    pub fn api_success_rate(&self) -> f64 {
        percentage(
            self.api_calls.saturating_sub(self.api_failures),
            self.api_calls,
        )
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
