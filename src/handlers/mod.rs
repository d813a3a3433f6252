mod free_license;
mod payment;
mod verify;

pub use free_license::*;
pub use payment::*;
pub use verify::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::config::RateLimits;
use crate::rate_limit;
use crate::service::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(limits: RateLimits) -> Router<AppState> {
    // Strict tier: calls out to the payment gateway
    let strict = Router::new()
        .route("/payment/create-order", post(create_order))
        .route_layer(rate_limit::per_minute(limits.strict_rpm));

    // Standard tier: store and crypto work only
    let standard = Router::new()
        .route("/free-license", post(free_license))
        .route("/payment/verify", post(verify_payment))
        .route("/verify-license", get(verify_license).post(register_license))
        .route_layer(rate_limit::per_minute(limits.standard_rpm));

    let relaxed = Router::new()
        .route("/health", get(health))
        .route_layer(rate_limit::per_minute(limits.relaxed_rpm));

    Router::new().merge(strict).merge(standard).merge(relaxed)
}
