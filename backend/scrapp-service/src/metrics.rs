//! Prometheus metrics for scrapp-service.
//!
//! Exposes classifier and chat collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Classification requests by outcome (ok, bad_request, error) and predicted label.
    pub static ref CLASSIFY_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "classify_requests_total",
        "Classification requests segmented by outcome and predicted label",
        &["outcome", "label"]
    )
    .expect("failed to register classify_requests_total");

    /// Wall time of a single model forward pass.
    pub static ref INFERENCE_DURATION_SECONDS: Histogram = register_histogram!(
        "classifier_inference_duration_seconds",
        "Trash classifier inference latency",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("failed to register classifier_inference_duration_seconds");

    /// Disposal chat requests by outcome (ok, bad_request, upstream_error).
    pub static ref CHAT_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "disposal_chat_requests_total",
        "Disposal chat requests segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register disposal_chat_requests_total");
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
