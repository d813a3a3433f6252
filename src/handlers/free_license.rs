use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::notify::{SignupEvent, spawn_signup_capture};
use crate::service::{AppState, normalize_email, valid_email};
use crate::store::LicenseSource;

#[derive(Debug, Deserialize)]
pub struct FreeLicenseRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeLicenseResponse {
    pub license_key: String,
}

/// POST /free-license - issue (or re-issue) a free license for an email.
pub async fn free_license(
    State(state): State<AppState>,
    Json(body): Json<FreeLicenseRequest>,
) -> Result<Json<FreeLicenseResponse>> {
    let email = body
        .email
        .as_deref()
        .filter(|e| valid_email(e))
        .ok_or_else(|| AppError::BadRequest("Valid email is required".into()))?;

    let issued = state.service.issue_free(email);

    // Capture only first-time signups; a re-issued key is already on the list
    if !issued.reused {
        spawn_signup_capture(
            state.http_client.clone(),
            state.capture_url.clone(),
            SignupEvent {
                email: normalize_email(email),
                license_key: issued.key.clone(),
                source: LicenseSource::Free,
                created_at: Utc::now().timestamp(),
            },
        );
    }

    Ok(Json(FreeLicenseResponse {
        license_key: issued.key,
    }))
}
