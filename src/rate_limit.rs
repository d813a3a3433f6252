//! Per-IP rate limiting for the public endpoints.
//!
//! Brute-forcing keys is not the concern here (keys carry ~90 bits of
//! entropy); the limits exist to keep a misbehaving client from hammering
//! the store or, worse, the payment gateway.
//!
//! Configure via environment variables:
//! - RATE_LIMIT_STRICT_RPM (default: 10) - /payment/create-order
//! - RATE_LIMIT_STANDARD_RPM (default: 30) - license endpoints
//! - RATE_LIMIT_RELAXED_RPM (default: 60) - /health

use std::sync::Arc;
use std::time::Duration;

use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;

/// Rate limiter layer type alias using governor types directly
pub type RateLimitLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Creates a per-IP rate limiter layer allowing `requests_per_minute`.
pub fn per_minute(requests_per_minute: u32) -> RateLimitLayer {
    assert!(requests_per_minute > 0, "Rate limit must be greater than 0");

    let period_secs = 60 / requests_per_minute as u64;
    let config = GovernorConfigBuilder::default()
        .period(Duration::from_secs(period_secs.max(1)))
        .burst_size(requests_per_minute)
        .finish()
        .expect("Failed to build rate limiter config");

    GovernorLayer::new(Arc::new(config))
}
