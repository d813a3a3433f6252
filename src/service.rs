//! License issuance and verification.
//!
//! Per-key lifecycle: unissued -> issued (uses = 0) -> activated (uses = 1)
//! -> rejected (uses > 1). Activation is the first verification of a key;
//! every later verification is refused as a second device.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::keygen::KeyGenerator;
use crate::payments::{Product, RazorpayClient};
use crate::signature::SignatureVerifier;
use crate::store::{LicenseRecord, LicenseSource, LicenseStore};

/// Reserved keys handed out by sales for demos. Always verify as valid and
/// never touch the store, so demo sessions don't burn real activations.
pub const DEMO_KEYS: &[&str] = &["KW-DEMO-2025", "KEYWELL-DEMO-KEY"];

const DEMO_EMAIL: &str = "demo@keywell.app";

/// Shared application state, constructed once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LicenseService>,
    pub verifier: Arc<SignatureVerifier>,
    /// Present only when gateway credentials are configured
    pub gateway: Option<Arc<RazorpayClient>>,
    pub product: Product,
    /// Shared secret for out-of-band registration; None disables the endpoint
    pub admin_secret: Option<String>,
    /// Signup capture webhook; None disables capture
    pub capture_url: Option<String>,
    pub http_client: reqwest::Client,
}

/// Outcome of a free-path issuance.
#[derive(Debug)]
pub struct Issued {
    pub key: String,
    /// True when an existing key for this email was returned instead of a new one
    pub reused: bool,
}

/// Outcome of a verification lookup.
#[derive(Debug)]
pub struct Verification {
    pub valid: bool,
    pub uses: i64,
    pub email: Option<String>,
    pub message: String,
}

pub struct LicenseService {
    store: Arc<dyn LicenseStore>,
    keygen: KeyGenerator,
}

impl LicenseService {
    pub fn new(store: Arc<dyn LicenseStore>, keygen: KeyGenerator) -> Self {
        Self { store, keygen }
    }

    /// Issue a free-tier license for an email address.
    ///
    /// Idempotent per email while the store is available: a repeat signup
    /// gets the previously issued key back. Store failures downgrade to an
    /// unpersisted (but working) key rather than failing the request.
    pub fn issue_free(&self, email: &str) -> Issued {
        let email = normalize_email(email);

        match self.store.key_for_email(&email) {
            Ok(Some(key)) => {
                tracing::debug!("Returning existing license for {}", email);
                return Issued { key, reused: true };
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("License store lookup failed, minting a fresh key: {}", e);
            }
        }

        let key = self.keygen.generate();
        let record = LicenseRecord::new(&key, &email, LicenseSource::Free, now());
        if let Err(e) = self.store.put(&record) {
            tracing::warn!("License store write failed, issuing unpersisted key: {}", e);
        }

        tracing::info!("Issued free license {} for {}", key, email);
        Issued { key, reused: false }
    }

    /// Issue a license after a verified payment.
    ///
    /// The customer has paid by the time this runs, so it cannot fail: a
    /// store error is logged and the freshly minted key is returned anyway.
    pub fn issue_paid(&self, email: &str, order_id: &str, payment_id: &str) -> String {
        let email = normalize_email(email);
        let key = self.keygen.generate();

        let mut record = LicenseRecord::new(&key, &email, LicenseSource::Paid, now());
        record.order_id = Some(order_id.to_string());
        record.payment_id = Some(payment_id.to_string());

        if let Err(e) = self.store.put(&record) {
            tracing::error!(
                "License store write failed after payment {} - key {} issued unpersisted: {}",
                payment_id,
                key,
                e
            );
        }

        tracing::info!("Issued paid license {} for order {}", key, order_id);
        key
    }

    /// Verify (and thereby activate) a license key.
    ///
    /// The first verification of an issued key activates it; any later one
    /// is rejected as already activated. Unknown keys are reported invalid,
    /// never created. A store outage degrades to "not found".
    pub fn verify(&self, key: &str) -> Verification {
        if DEMO_KEYS.contains(&key) {
            return Verification {
                valid: true,
                uses: 1,
                email: Some(DEMO_EMAIL.to_string()),
                message: "Demo license activated.".to_string(),
            };
        }

        if !self.keygen.is_valid_format(key) {
            return Verification {
                valid: false,
                uses: 0,
                email: None,
                message: format!(
                    "Invalid license key format. Keys should start with {}-",
                    self.keygen.prefix()
                ),
            };
        }

        let record = match self.store.record_use(key, now()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("License store unavailable during verification: {}", e);
                None
            }
        };

        match record {
            None => Verification {
                valid: false,
                uses: 0,
                email: None,
                message: "License key not found.".to_string(),
            },
            Some(record) if record.uses == 1 => Verification {
                valid: true,
                uses: record.uses,
                email: Some(record.email),
                message: "License activated successfully.".to_string(),
            },
            Some(record) => Verification {
                valid: false,
                uses: record.uses,
                email: None,
                message: "License key already activated on another device.".to_string(),
            },
        }
    }

    /// Register a license out-of-band (admin path). Unlike issuance, a store
    /// failure here surfaces to the caller - nothing was paid for yet.
    pub fn register(&self, key: &str, email: &str) -> Result<()> {
        let record = LicenseRecord::new(key, &normalize_email(email), LicenseSource::Admin, now());
        self.store.put(&record)?;
        tracing::info!("Registered license {} out-of-band", key);
        Ok(())
    }
}

/// Lowercase and trim, so `User@Example.com ` and `user@example.com` map to
/// the same idempotency slot.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check; real validation is the payment/signup flow itself.
pub fn valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.contains('@')
}

fn now() -> i64 {
    Utc::now().timestamp()
}
