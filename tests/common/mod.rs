//! Test utilities and fixtures for Keywell integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use serde_json::Value;
use tower::ServiceExt;

pub use keywell::error::{AppError, Result};
pub use keywell::handlers::{
    create_order, free_license, register_license, verify_license, verify_payment,
};
pub use keywell::keygen::KeyGenerator;
pub use keywell::payments::Product;
pub use keywell::service::{AppState, DEMO_KEYS, LicenseService};
pub use keywell::signature::SignatureVerifier;
pub use keywell::store::{LicenseRecord, LicenseSource, LicenseStore, MemoryStore, SqliteStore};

pub const TEST_SECRET: &str = "test_gateway_secret";
pub const TEST_ADMIN_SECRET: &str = "test-admin-secret";

/// AppState backed by a fresh in-memory store.
pub fn test_state() -> AppState {
    test_state_with_store(Arc::new(MemoryStore::new()))
}

/// AppState over an explicit store (to share the store with assertions).
pub fn test_state_with_store(store: Arc<dyn LicenseStore>) -> AppState {
    AppState {
        service: Arc::new(LicenseService::new(store, KeyGenerator::new("KW"))),
        verifier: Arc::new(SignatureVerifier::new(Some(TEST_SECRET.to_string()))),
        gateway: None,
        product: Product {
            name: "Keywell Founder Edition".to_string(),
            amount: 4900,
            currency: "USD".to_string(),
        },
        admin_secret: Some(TEST_ADMIN_SECRET.to_string()),
        capture_url: None,
        http_client: reqwest::Client::new(),
    }
}

/// Router with all public endpoints (no rate limiting in tests).
pub fn public_app(state: AppState) -> Router {
    Router::new()
        .route("/free-license", post(free_license))
        .route("/payment/create-order", post(create_order))
        .route("/payment/verify", post(verify_payment))
        .route("/verify-license", get(verify_license).post(register_license))
        .with_state(state)
}

/// POST a JSON body and return (status, parsed response body).
pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    into_json(response).await
}

/// GET a URI and return (status, parsed response body).
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    into_json(response).await
}

async fn into_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response should be valid JSON")
    };
    (status, json)
}

/// Compute the gateway callback signature the way the provider does:
/// HMAC-SHA256 over `orderId|paymentId`, hex-encoded.
pub fn sign_callback(order_id: &str, payment_id: &str, secret: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Issue a free license through the API and return the key.
pub async fn issue_key(app: &Router, email: &str) -> String {
    let (status, body) = post_json(
        app,
        "/free-license",
        serde_json::json!({ "email": email }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["licenseKey"].as_str().expect("licenseKey").to_string()
}

/// A store whose every operation fails, for outage-path tests.
pub struct FailingStore;

impl LicenseStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<LicenseRecord>> {
        Err(AppError::Internal("store down".into()))
    }

    fn put(&self, _record: &LicenseRecord) -> Result<()> {
        Err(AppError::Internal("store down".into()))
    }

    fn key_for_email(&self, _email: &str) -> Result<Option<String>> {
        Err(AppError::Internal("store down".into()))
    }

    fn record_use(&self, _key: &str, _now: i64) -> Result<Option<LicenseRecord>> {
        Err(AppError::Internal("store down".into()))
    }
}
