use axum::extract::State;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::service::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyLicenseQuery {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyLicenseResponse {
    pub valid: bool,
    pub uses: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub message: String,
}

/// GET /verify-license?key=... - check a license key, activating it on the
/// first successful lookup. Unknown or spent keys come back `valid: false`
/// in a 200; only a missing parameter is a client error.
pub async fn verify_license(
    State(state): State<AppState>,
    Query(query): Query<VerifyLicenseQuery>,
) -> Result<Json<VerifyLicenseResponse>> {
    let key = query
        .key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing license key parameter".into()))?;

    let outcome = state.service.verify(key);

    Ok(Json(VerifyLicenseResponse {
        valid: outcome.valid,
        uses: outcome.uses,
        email: outcome.email,
        message: outcome.message,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterLicenseRequest {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterLicenseResponse {
    pub success: bool,
    pub key: String,
    pub message: String,
}

/// POST /verify-license - register a license out-of-band (support resends,
/// comped copies). Guarded by the shared admin secret; with no secret
/// configured every request is rejected.
pub async fn register_license(
    State(state): State<AppState>,
    Json(body): Json<RegisterLicenseRequest>,
) -> Result<Json<RegisterLicenseResponse>> {
    let configured = state.admin_secret.as_deref().ok_or(AppError::Unauthorized)?;
    let provided = body.secret.as_deref().unwrap_or_default();
    if !bool::from(provided.as_bytes().ct_eq(configured.as_bytes())) {
        return Err(AppError::Unauthorized);
    }

    let (Some(key), Some(email)) = (
        body.key.filter(|k| !k.trim().is_empty()),
        body.email.filter(|e| !e.trim().is_empty()),
    ) else {
        return Err(AppError::BadRequest("Missing key or email".into()));
    };

    state.service.register(&key, &email)?;

    Ok(Json(RegisterLicenseResponse {
        success: true,
        key,
        message: "License registered successfully.".to_string(),
    }))
}
