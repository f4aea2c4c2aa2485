//! Token endpoint client
//!
//! Both grant requests the manager issues - authorization-code exchange and
//! refresh - are form POSTs to the same token endpoint, differing only in
//! their `grant_type` and accompanying fields. The endpoint is injected as a
//! trait so tests can script responses without a network.

use async_trait::async_trait;
use serde::Deserialize;

use crate::constants::TOKEN_ENDPOINT;
use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Parsed token endpoint response body.
///
/// Every field is optional: a refresh response may carry only a new access
/// token, and a misbehaving endpoint may return a body with none at all -
/// the manager treats that the same as a failure.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "accessToken", default)]
    pub access_token: Option<String>,
    #[serde(alias = "refreshToken", default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(alias = "tokenType", default)]
    pub token_type: Option<String>,
    #[serde(alias = "expiresIn", default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// Convert an exchange response into a credential.
    ///
    /// Returns `None` when the body has no usable access token.
    pub fn into_credential(self) -> Option<Credential> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        Some(Credential {
            access_token,
            refresh_token: self.refresh_token,
            created_at: None,
            scope: self.scope,
            token_type: self.token_type,
            expires_in: self.expires_in,
        })
    }
}

/// Token endpoint collaborator: one form-encoded POST, parsed JSON back.
/// Provider rejections surface as `Error::Exchange` carrying the error body.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn post(&self, form: &[(String, String)]) -> Result<TokenResponse>;
}

/// `reqwest`-backed token endpoint client.
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenEndpoint {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_url(client, TOKEN_ENDPOINT)
    }

    /// Point the client at a non-default endpoint (used by tests).
    pub fn with_url(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn post(&self, form: &[(String, String)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(&self.url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Exchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::Exchange(format!("invalid token response: {e}")))
    }
}
