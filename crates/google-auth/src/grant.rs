//! Grant flow strategies
//!
//! The Authorization-Code flow and the legacy Implicit flow differ in three
//! places: the `response_type` they request, how the authorization result
//! comes back on the redirect URI (query `code` vs. fragment token fields),
//! and whether the resulting credential can be refreshed. Everything else in
//! the manager is shared, so the duality is a small strategy enum rather
//! than two managers.

use crate::config::AuthRequest;
use crate::constants::{AUTHORIZE_ENDPOINT, CREDENTIALS_KEY, LEGACY_TOKEN_KEY};
use crate::credentials::Credential;

/// Which OAuth grant the manager drives. Selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrantFlow {
    /// Authorization-Code grant: exchangeable code, refreshable credential.
    #[default]
    AuthorizationCode,
    /// Legacy Implicit grant: token delivered in the URI fragment, no refresh.
    Implicit,
}

/// Authorization outcome extracted from a redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    /// Authorization code to exchange at the token endpoint
    Code(String),
    /// Complete credential delivered directly (Implicit flow)
    Token(Credential),
}

impl GrantFlow {
    pub fn response_type(self) -> &'static str {
        match self {
            GrantFlow::AuthorizationCode => "code",
            GrantFlow::Implicit => "token",
        }
    }

    /// Whether credentials from this flow carry a refresh token.
    pub fn supports_refresh(self) -> bool {
        matches!(self, GrantFlow::AuthorizationCode)
    }

    /// The Implicit flow never presents the client secret.
    pub fn requires_client_secret(self) -> bool {
        matches!(self, GrantFlow::AuthorizationCode)
    }

    /// Persistence slot for this flow. The two slots hold different record
    /// shapes and are not interoperable.
    pub fn storage_key(self) -> &'static str {
        match self {
            GrantFlow::AuthorizationCode => CREDENTIALS_KEY,
            GrantFlow::Implicit => LEGACY_TOKEN_KEY,
        }
    }

    /// Build the authorization endpoint URI.
    ///
    /// Parameter order is fixed (insertion order) so the output is
    /// deterministic: `client_id`, `redirect_uri`, `scope`, `access_type`,
    /// `prompt`, `response_type`, then `state` and `login_hint` when
    /// configured. Offline access and forced consent are always requested.
    pub fn auth_uri(self, request: &AuthRequest) -> String {
        let mut uri = format!(
            "{}?client_id={}&redirect_uri={}&scope={}&access_type=offline&prompt={}&response_type={}",
            AUTHORIZE_ENDPOINT,
            request.client_id,
            request.redirect_uri.as_deref().unwrap_or_default(),
            encode_spaces(&request.scope.join()),
            request.prompt.as_deref().unwrap_or("consent"),
            self.response_type(),
        );
        if let Some(state) = &request.state {
            uri.push_str("&state=");
            uri.push_str(&encode_spaces(state));
        }
        if let Some(hint) = &request.login_hint {
            uri.push_str("&login_hint=");
            uri.push_str(&encode_spaces(hint));
        }
        uri
    }

    /// Extract the authorization result from a redirect URI, if present.
    ///
    /// Authorization-Code: the `code` query parameter. Implicit: fragment
    /// parameters, all four of `access_token`, `scope`, `expires_in` and
    /// `token_type` required; a partial fragment yields no result.
    pub fn extract_result(self, uri: &str) -> Option<AuthorizationResult> {
        match self {
            GrantFlow::AuthorizationCode => {
                let query = uri.split_once('?')?.1;
                let query = query.split('#').next().unwrap_or(query);
                param(query, "code").map(AuthorizationResult::Code)
            }
            GrantFlow::Implicit => {
                let fragment = uri.split_once('#')?.1;
                let access_token = param(fragment, "access_token")?;
                let scope = param(fragment, "scope")?;
                let expires_in = param(fragment, "expires_in")?;
                let token_type = param(fragment, "token_type")?;
                Some(AuthorizationResult::Token(Credential {
                    access_token,
                    refresh_token: None,
                    created_at: None,
                    scope: Some(scope),
                    token_type: Some(token_type),
                    expires_in: expires_in.parse().ok(),
                }))
            }
        }
    }
}

/// Look up one key in a `k=v&k=v` parameter string, percent-decoded.
fn param(params: &str, key: &str) -> Option<String> {
    params
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| percent_decode(v))
        .filter(|v| !v.is_empty())
}

/// Decode `%XX` escapes and `+` in a query/fragment value.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Encode spaces in a parameter value. Scope lists are space-joined and the
/// only configured values that may legitimately contain spaces.
fn encode_spaces(value: &str) -> String {
    value.replace(' ', "%20")
}
