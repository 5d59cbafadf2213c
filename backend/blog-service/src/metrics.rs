//! Prometheus metrics for blog-service.
//!
//! Exposes blog collectors and an HTTP handler for the `/metrics` endpoint. Page
//! cache and pool gauges are registered by their libraries into the same registry.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Follow/unfollow requests by outcome (created, exists, removed, absent, self).
    pub static ref FOLLOW_EVENTS: IntCounterVec = register_int_counter_vec!(
        "blog_follow_events_total",
        "Follow requests segmented by action and result",
        &["action", "result"]
    )
    .expect("failed to register blog_follow_events_total");

    /// Posts and comments written.
    pub static ref POSTS_WRITTEN: IntCounterVec = register_int_counter_vec!(
        "blog_posts_written_total",
        "Post and comment writes segmented by operation",
        &["op"]
    )
    .expect("failed to register blog_posts_written_total");
}

pub fn record_follow(action: &str, result: &str) {
    FOLLOW_EVENTS.with_label_values(&[action, result]).inc();
}

pub fn record_write(op: &str) {
    POSTS_WRITTEN.with_label_values(&[op]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
