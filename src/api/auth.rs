//! `POST /api/auth/verify` - wallet-signature login.

use super::{ApiError, AppState};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Login request body. Fields default to empty so missing and empty inputs
/// fail validation identically instead of bouncing off deserialization.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Address claiming to sign in.
    #[serde(default)]
    pub address: String,
    /// The full sign-in message that was signed.
    #[serde(default)]
    pub message: String,
    /// Hex-encoded signature over the message.
    #[serde(default)]
    pub signature: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Always `true` on success.
    pub ok: bool,
    /// Checksummed address that proved control of its key.
    pub address: String,
    /// Fresh opaque session token.
    pub session_token: String,
    /// Human-readable confirmation.
    pub message: String,
}

/// Verify a login attempt.
///
/// # Errors
///
/// 400 for missing fields, a malformed message or a consumed nonce; 401 for
/// a signature that does not verify; 500 for ledger or RPC failures.
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let login = state
        .verifier
        .verify_login(&request.address, &request.message, &request.signature)
        .await?;
    Ok(Json(VerifyResponse {
        ok: true,
        address: login.address,
        session_token: login.session_token,
        message: "Authentication successful".to_string(),
    }))
}
