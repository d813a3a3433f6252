//! In-memory license store.
//!
//! Process-scoped fallback for when no database is configured, and the
//! default store in tests. Records are gone on restart - the free-path
//! idempotency mapping only holds for the life of the process.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{LicenseRecord, LicenseSource, LicenseStore};
use crate::error::Result;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, LicenseRecord>,
    free_key_by_email: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("license store mutex poisoned")
    }
}

impl LicenseStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<LicenseRecord>> {
        Ok(self.lock().records.get(key).cloned())
    }

    fn put(&self, record: &LicenseRecord) -> Result<()> {
        let mut inner = self.lock();
        if record.source == LicenseSource::Free {
            inner
                .free_key_by_email
                .entry(record.email.clone())
                .or_insert_with(|| record.key.clone());
        }
        inner.records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn key_for_email(&self, email: &str) -> Result<Option<String>> {
        Ok(self.lock().free_key_by_email.get(email).cloned())
    }

    fn record_use(&self, key: &str, now: i64) -> Result<Option<LicenseRecord>> {
        let mut inner = self.lock();
        // The whole read-modify-write happens under one guard, so two
        // concurrent verifications can never both see uses == 1.
        Ok(inner.records.get_mut(key).map(|record| {
            record.uses += 1;
            record.activated_at.get_or_insert(now);
            record.clone()
        }))
    }
}
