use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::notify::{SignupEvent, spawn_signup_capture};
use crate::payments::Order;
use crate::service::{AppState, normalize_email};
use crate::store::LicenseSource;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: Order,
    /// Public key id the frontend hands to the checkout widget
    pub key: String,
    pub product: String,
}

/// POST /payment/create-order - open a gateway order for the product.
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required".into()))?;

    let gateway = state.gateway.as_ref().ok_or_else(|| {
        AppError::Unconfigured("Payment gateway not configured. Please contact support.".into())
    })?;

    let order = gateway.create_order(&state.product, email).await?;

    Ok(Json(CreateOrderResponse {
        success: true,
        order,
        key: gateway.key_id().to_string(),
        product: state.product.name.clone(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub license_key: String,
    pub email: String,
    pub message: String,
}

/// POST /payment/verify - verify the checkout callback signature and issue
/// the paid license.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>> {
    let order_id = require(body.order_id)?;
    let payment_id = require(body.payment_id)?;
    let signature = require(body.signature)?;
    let email = require(body.email)?;

    if !state.verifier.verify(&order_id, &payment_id, &signature) {
        tracing::warn!("Invalid payment signature for order {}", order_id);
        return Err(AppError::BadRequest(
            "Invalid payment signature. Payment verification failed.".into(),
        ));
    }

    let email = normalize_email(&email);
    let license_key = state.service.issue_paid(&email, &order_id, &payment_id);

    spawn_signup_capture(
        state.http_client.clone(),
        state.capture_url.clone(),
        SignupEvent {
            email: email.clone(),
            license_key: license_key.clone(),
            source: LicenseSource::Paid,
            created_at: Utc::now().timestamp(),
        },
    );

    Ok(Json(VerifyPaymentResponse {
        success: true,
        license_key,
        email,
        message: "Payment verified successfully. Your license key is ready!".to_string(),
    }))
}

fn require(field: Option<String>) -> Result<String> {
    field.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        AppError::BadRequest("Missing required payment verification fields".into())
    })
}
