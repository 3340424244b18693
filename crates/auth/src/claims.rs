//! Unverified access-token claims (decode + expiry evaluation).
//!
//! The client decodes the claims segment of the bearer token purely to make
//! load-time decisions (expiry, company scoping). **No signature is
//! verified** - a client cannot hold the verification key, so nothing here
//! is a security boundary; the backend re-checks the token on every
//! authenticated call.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Grace window before a decoded `exp` is treated as expired, in seconds.
///
/// Absorbs clock skew between client and backend.
pub const EXPIRY_GRACE_SECS: i64 = 5 * 60;

/// The claims this client cares about. Everything else in the payload is
/// carried by the token but ignored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiry as unix seconds. Absent on legacy tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    // Company-scoped logins carry their scoping in the token; used to
    // enrich the identity when the login response body omits these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenDecodeError {
    #[error("token is not a three-segment JWT")]
    MalformedStructure,

    #[error("claims segment is not valid base64url: {0}")]
    Base64(String),

    #[error("claims segment is not valid JSON: {0}")]
    Json(String),
}

/// Decode the claims (middle) segment of `token` without verifying the
/// signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenDecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenDecodeError::MalformedStructure);
    }

    // Tolerate padded emitters; JWT proper is unpadded base64url.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenDecodeError::Base64(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenDecodeError::Json(e.to_string()))
}

/// Load-time verdict on a decoded claims payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExpiry {
    /// No `exp` claim, or `exp` within the grace window.
    Valid,
    /// `exp` more than the grace window in the past.
    Expired,
}

/// Deterministically evaluate expiry of decoded claims at `now`.
pub fn evaluate_expiry(claims: &TokenClaims, now: DateTime<Utc>) -> TokenExpiry {
    match claims.exp {
        Some(exp) if exp + EXPIRY_GRACE_SECS < now.timestamp() => TokenExpiry::Expired,
        _ => TokenExpiry::Valid,
    }
}
