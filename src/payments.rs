//! Razorpay order creation (REST API).
//!
//! The gateway is an opaque collaborator: we create an order, the hosted
//! checkout collects payment, and the success callback comes back through
//! `POST /payment/verify` carrying the signed (orderId, paymentId) pair.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

const API_BASE: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
}

/// The single product this backend sells.
#[derive(Debug, Clone)]
pub struct Product {
    pub name: String,
    /// Price in the smallest currency unit
    pub amount: i64,
    pub currency: String,
}

/// Order as returned by the gateway and surfaced to the checkout widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
    notes: OrderNotes<'a>,
}

#[derive(Debug, Serialize)]
struct OrderNotes<'a> {
    email: &'a str,
    product: &'a str,
}

#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    /// Public key id the frontend hands to the checkout widget.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a payment order for `product`, tagged with the buyer's email.
    pub async fn create_order(&self, product: &Product, email: &str) -> Result<Order> {
        let request = CreateOrderRequest {
            amount: product.amount,
            currency: &product.currency,
            receipt: format!("kw_{}", Uuid::new_v4().as_simple()),
            notes: OrderNotes {
                email,
                product: &product.name,
            },
        };

        let response = self
            .client
            .post(format!("{}/orders", API_BASE))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Razorpay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Razorpay API error: {}",
                error_text
            )));
        }

        let order: Order = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Razorpay response: {}", e)))?;

        Ok(order)
    }
}
