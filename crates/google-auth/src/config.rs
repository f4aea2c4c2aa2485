//! Auth request parameters and eager validation
//!
//! `AuthRequest` carries the OAuth client configuration. It is immutable once
//! handed to the manager and validated eagerly: a missing required field is a
//! `Configuration` error before any storage or network access happens.

use common::Secret;

use crate::error::{Error, Result};
use crate::grant::GrantFlow;

/// Set of OAuth scopes. A single scope string normalizes to a one-element set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scopes(Vec<String>);

impl Scopes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Space-joined scope list, as the authorization endpoint expects.
    pub fn join(&self) -> String {
        self.0.join(" ")
    }
}

impl From<&str> for Scopes {
    fn from(scope: &str) -> Self {
        Self(vec![scope.to_owned()])
    }
}

impl From<String> for Scopes {
    fn from(scope: String) -> Self {
        Self(vec![scope])
    }
}

impl From<Vec<String>> for Scopes {
    fn from(scopes: Vec<String>) -> Self {
        Self(scopes)
    }
}

impl From<&[&str]> for Scopes {
    fn from(scopes: &[&str]) -> Self {
        Self(scopes.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// OAuth client parameters for one identity provider registration.
///
/// `client_secret` is required for the Authorization-Code flow only; the
/// legacy Implicit flow never presents it. `redirect_uri` may be left unset
/// by embedded-window hosts, in which case the manager substitutes the
/// out-of-band loopback URI.
#[derive(Debug)]
pub struct AuthRequest {
    pub client_id: String,
    pub client_secret: Option<Secret<String>>,
    pub redirect_uri: Option<String>,
    pub scope: Scopes,
    pub state: Option<String>,
    pub login_hint: Option<String>,
    pub prompt: Option<String>,
}

impl AuthRequest {
    pub fn new(client_id: impl Into<String>, scope: impl Into<Scopes>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            scope: scope.into(),
            state: None,
            login_hint: None,
            prompt: None,
        }
    }

    pub fn client_secret(mut self, secret: impl Into<Secret<String>>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn login_hint(mut self, hint: impl Into<String>) -> Self {
        self.login_hint = Some(hint.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Check all fields the given flow requires are present and non-empty.
    pub(crate) fn validate(&self, flow: GrantFlow) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::Configuration("client_id is required".into()));
        }
        if flow.requires_client_secret()
            && self
                .client_secret
                .as_ref()
                .is_none_or(|s| s.expose().is_empty())
        {
            return Err(Error::Configuration(
                "client_secret is required for the authorization-code flow".into(),
            ));
        }
        if self.redirect_uri.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Configuration("redirect_uri is required".into()));
        }
        if self.scope.is_empty() {
            return Err(Error::Configuration("scope is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> AuthRequest {
        AuthRequest::new("c1", "read")
            .client_secret("s1")
            .redirect_uri("https://app/cb")
    }

    #[test]
    fn valid_request_passes_both_flows() {
        valid_request().validate(GrantFlow::AuthorizationCode).unwrap();
        valid_request().validate(GrantFlow::Implicit).unwrap();
    }

    #[test]
    fn missing_client_id_rejected() {
        let request = AuthRequest::new("", "read")
            .client_secret("s1")
            .redirect_uri("https://app/cb");
        let err = request.validate(GrantFlow::AuthorizationCode).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "got: {err}");
        assert!(err.to_string().contains("client_id"));
    }

    #[test]
    fn missing_client_secret_rejected_for_code_flow_only() {
        let request = AuthRequest::new("c1", "read").redirect_uri("https://app/cb");
        let err = request.validate(GrantFlow::AuthorizationCode).unwrap_err();
        assert!(err.to_string().contains("client_secret"));

        // The implicit flow never presents a secret
        request.validate(GrantFlow::Implicit).unwrap();
    }

    #[test]
    fn empty_client_secret_rejected() {
        let request = AuthRequest::new("c1", "read")
            .client_secret("")
            .redirect_uri("https://app/cb");
        assert!(request.validate(GrantFlow::AuthorizationCode).is_err());
    }

    #[test]
    fn missing_redirect_uri_rejected() {
        let request = AuthRequest::new("c1", "read").client_secret("s1");
        let err = request.validate(GrantFlow::AuthorizationCode).unwrap_err();
        assert!(err.to_string().contains("redirect_uri"));
    }

    #[test]
    fn empty_scope_rejected() {
        let request = AuthRequest::new("c1", Vec::<String>::new())
            .client_secret("s1")
            .redirect_uri("https://app/cb");
        let err = request.validate(GrantFlow::AuthorizationCode).unwrap_err();
        assert!(err.to_string().contains("scope"));
    }

    #[test]
    fn string_scope_normalizes_to_one_element_set() {
        let scopes: Scopes = "read".into();
        assert_eq!(scopes.as_slice(), ["read"]);
        assert_eq!(scopes.join(), "read");
    }

    #[test]
    fn scope_set_joins_with_spaces() {
        let scopes: Scopes = ["email", "profile"].as_slice().into();
        assert_eq!(scopes.join(), "email profile");
    }

    #[test]
    fn debug_output_redacts_client_secret() {
        let request = valid_request();
        let debug = format!("{request:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("s1"));
    }
}
