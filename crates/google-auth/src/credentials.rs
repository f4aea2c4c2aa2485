//! The credential entity
//!
//! One signed-in session's token pair and metadata. The persisted record and
//! the token-endpoint response body share this shape: storage uses camelCase
//! field names, and serde aliases accept the provider's snake_case wire names
//! (plus the legacy Implicit record's `type` field).

use serde::{Deserialize, Serialize};

/// Access/refresh token pair for one signed-in session.
///
/// Either wholly absent (signed out) or carries a non-empty access token.
/// A credential obtained via code exchange always has a refresh token; one
/// obtained via the legacy Implicit flow never does and cannot be refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Opaque bearer token presented to resource servers
    #[serde(alias = "access_token")]
    pub access_token: String,

    /// Refresh token, present only after an authorization-code exchange
    #[serde(alias = "refresh_token", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Unix milliseconds, stamped when the exchange completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(
        alias = "token_type",
        alias = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub token_type: Option<String>,

    /// Seconds until the access token expires (delta, not absolute)
    #[serde(alias = "expires_in", default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Current time as unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
