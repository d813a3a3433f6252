//! The license store: one capability trait, two implementations.
//!
//! `SqliteStore` is the production store; `MemoryStore` is the fallback used
//! when no database is configured (or opening it fails at startup) and in
//! tests. Which one backs the service is decided ONCE at startup - handlers
//! never probe for the database per call.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a license record came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseSource {
    /// Free-tier signup (email only)
    Free,
    /// Issued after a verified payment
    Paid,
    /// Registered out-of-band by an operator
    Admin,
}

impl LicenseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LicenseSource::Free => "free",
            LicenseSource::Paid => "paid",
            LicenseSource::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(LicenseSource::Free),
            "paid" => Some(LicenseSource::Paid),
            "admin" => Some(LicenseSource::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    /// The license key itself; unique and immutable once issued
    pub key: String,
    /// Purchaser/requester email, normalized (lowercased, trimmed)
    pub email: String,
    /// Verification counter; 1 after the first (successful) activation
    pub uses: i64,
    pub created_at: i64,
    /// Stamped on the first successful activation
    pub activated_at: Option<i64>,
    /// Gateway payment id (paid issuance only)
    pub payment_id: Option<String>,
    /// Gateway order id (paid issuance only)
    pub order_id: Option<String>,
    pub source: LicenseSource,
}

impl LicenseRecord {
    pub fn new(key: &str, email: &str, source: LicenseSource, created_at: i64) -> Self {
        Self {
            key: key.to_string(),
            email: email.to_string(),
            uses: 0,
            created_at,
            activated_at: None,
            payment_id: None,
            order_id: None,
            source,
        }
    }
}

/// Capability contract backing license records.
///
/// `record_use` is the load-bearing method: it must perform the
/// read-increment-write as ONE atomic conditional update so that two
/// concurrent verifications of the same key can never both observe
/// `uses == 1`.
pub trait LicenseStore: Send + Sync {
    /// Fetch a record by key.
    fn get(&self, key: &str) -> Result<Option<LicenseRecord>>;

    /// Insert (or overwrite) a record. Last write wins, like a KV `set`.
    fn put(&self, record: &LicenseRecord) -> Result<()>;

    /// Best-effort email -> key idempotency lookup for the free path.
    /// Only free-tier records participate; paid and admin issuance always mint.
    fn key_for_email(&self, email: &str) -> Result<Option<String>>;

    /// Atomically increment `uses`, stamping `activated_at` on the first use,
    /// and return the updated record. `None` when the key is unknown.
    fn record_use(&self, key: &str, now: i64) -> Result<Option<LicenseRecord>>;
}
