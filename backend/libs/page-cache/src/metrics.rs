//! Cache metrics for observability

use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static::lazy_static! {
    /// Page cache events (hit/miss/write/error) by key prefix.
    static ref PAGE_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "page_cache_events_total",
        "Page cache events segmented by key prefix and outcome",
        &["prefix", "event"]
    )
    .expect("failed to register page_cache_events_total");
}

/// Thin recorder bound to one key prefix.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    prefix: String,
}

impl CacheMetrics {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn record_hit(&self) {
        self.record("hit");
    }

    pub fn record_miss(&self) {
        self.record("miss");
    }

    pub fn record_write(&self) {
        self.record("write");
    }

    pub fn record_error(&self) {
        self.record("error");
    }

    fn record(&self, event: &str) {
        PAGE_CACHE_EVENTS
            .with_label_values(&[self.prefix.as_str(), event])
            .inc();
    }
}
