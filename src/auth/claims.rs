use crate::auth::token_store::TokenStore;
use crate::types::Role;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Claims embedded in the shop's access token.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("token is not a three-part JWT")]
    Malformed,
    #[error("payload is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the payload segment of a JWT without verifying its signature.
/// The client never holds the signing key; the backend re-validates every request.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ClaimsError> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ClaimsError::Malformed);
    };
    // Some encoders keep padding; the URL-safe engine here does not accept it.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Role claim of a token, or `None` if the token is unreadable or carries no role.
pub fn role_of(token: &str) -> Option<Role> {
    match decode_claims(token) {
        Ok(claims) => claims.role,
        Err(e) => {
            warn!(error = %e, "invalid token; treating as no role");
            None
        }
    }
}

/// Role of the currently stored token.
pub fn current_role(store: &dyn TokenStore) -> Option<Role> {
    let token = store
        .load()
        .inspect_err(|e| warn!(error = %e, "failed to read stored token"))
        .ok()??;
    role_of(&token)
}
