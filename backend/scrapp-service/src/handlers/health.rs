use crate::AppState;
use actix_web::{web, HttpResponse};
use std::time::Instant;

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "scrapp-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once the post store answers a round trip
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let start = Instant::now();
    match state.posts.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ready",
            "latency_ms": start.elapsed().as_millis() as u64
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unavailable",
                "error": format!("PostgreSQL connection failed: {}", e)
            }))
        }
    }
}
