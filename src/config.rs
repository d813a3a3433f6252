use std::env;

use crate::payments::{Product, RazorpayConfig};

/// Per-IP rate limits for the public endpoints, in requests per minute.
///
/// Strict covers endpoints that call out to the payment gateway, standard
/// covers the license endpoints, relaxed covers health checks.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub strict_rpm: u32,
    pub standard_rpm: u32,
    pub relaxed_rpm: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Path to the SQLite license database. Unset = in-memory store.
    pub database_path: Option<String>,
    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<String>,
    /// Shared secret guarding out-of-band license registration.
    /// Unset = registration rejects every request.
    pub admin_secret: Option<String>,
    /// Webhook receiving best-effort signup capture events.
    pub signup_webhook_url: Option<String>,
    pub product: Product,
    pub key_prefix: String,
    pub rate_limits: RateLimits,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("KEYWELL_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let product = Product {
            name: env::var("PRODUCT_NAME")
                .unwrap_or_else(|_| "Keywell Founder Edition".to_string()),
            amount: env::var("PRODUCT_AMOUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4900),
            currency: env::var("PRODUCT_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
        };

        let rate_limits = RateLimits {
            strict_rpm: env_u32("RATE_LIMIT_STRICT_RPM", 10),
            standard_rpm: env_u32("RATE_LIMIT_STANDARD_RPM", 30),
            relaxed_rpm: env_u32("RATE_LIMIT_RELAXED_RPM", 60),
        };

        Self {
            host,
            port,
            database_path: non_empty(env::var("DATABASE_PATH")),
            razorpay_key_id: non_empty(env::var("RAZORPAY_KEY_ID")),
            razorpay_key_secret: non_empty(env::var("RAZORPAY_KEY_SECRET")),
            admin_secret: non_empty(env::var("LICENSE_ADMIN_SECRET")),
            signup_webhook_url: non_empty(env::var("KEYWELL_SIGNUP_WEBHOOK_URL")),
            product,
            key_prefix: env::var("LICENSE_KEY_PREFIX").unwrap_or_else(|_| "KW".to_string()),
            rate_limits,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Gateway credentials, present only when both halves are configured.
    pub fn razorpay(&self) -> Option<RazorpayConfig> {
        match (&self.razorpay_key_id, &self.razorpay_key_secret) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayConfig {
                key_id: key_id.clone(),
                key_secret: key_secret.clone(),
            }),
            _ => None,
        }
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn non_empty(var: Result<String, env::VarError>) -> Option<String> {
    var.ok().filter(|v| !v.trim().is_empty())
}
