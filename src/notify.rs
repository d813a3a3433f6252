//! Signup capture webhook support.
//!
//! When configured via `KEYWELL_SIGNUP_WEBHOOK_URL`, Keywell forwards each
//! new issuance (email + key) to an external endpoint for the product-update
//! mailing list. This is strictly best-effort: delivery runs in a background
//! task, failures are logged, and the caller's response never depends on it.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;

use crate::store::LicenseSource;

/// Retry delays in milliseconds. Quick (100ms, 200ms) - the task outlives
/// the request, but there is no point hammering a dead endpoint.
const CAPTURE_RETRY_DELAYS: &[u64] = &[100, 200];

/// Signup capture payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupEvent {
    pub email: String,
    pub license_key: String,
    pub source: LicenseSource,
    /// Unix timestamp of issuance
    pub created_at: i64,
}

/// Spawn a fire-and-forget signup capture event.
///
/// No-op when capture is not configured. The spawned task catches its own
/// panics and logs them, so a capture bug can never take a worker down
/// silently.
pub fn spawn_signup_capture(client: Client, capture_url: Option<String>, event: SignupEvent) {
    let Some(url) = capture_url else {
        return;
    };

    let email = event.email.clone();
    tokio::spawn(
        AssertUnwindSafe(async move {
            send_capture_event(&client, &url, &event).await;
        })
        .catch_unwind()
        .map(move |result| {
            if let Err(panic) = result {
                tracing::error!(
                    "Signup capture task panicked for {}: {}",
                    email,
                    panic_message(&panic)
                );
            }
        }),
    );
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn send_capture_event(client: &Client, url: &str, event: &SignupEvent) {
    // Attempt 0 fires immediately; each retry waits its slot's delay first
    for attempt in 0..=CAPTURE_RETRY_DELAYS.len() {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(CAPTURE_RETRY_DELAYS[attempt - 1])).await;
        }

        let sent = client
            .post(url)
            .json(event)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match sent {
            Ok(resp) if resp.status().is_success() => {
                if attempt > 0 {
                    tracing::debug!("Signup capture succeeded after {} retries", attempt);
                }
                return;
            }
            Ok(resp) => tracing::debug!("Signup capture webhook returned {}", resp.status()),
            Err(e) => tracing::debug!("Signup capture webhook failed: {}", e),
        }
    }

    tracing::warn!(
        "Signup capture failed after {} attempts",
        CAPTURE_RETRY_DELAYS.len() + 1
    );
}
