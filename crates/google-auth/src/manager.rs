//! Credential lifecycle manager
//!
//! Owns the in-memory credential - the single source of truth - and writes a
//! serialized mirror through to the key-value store on every mutation. The
//! constructor validates and wires dependencies only; `start` performs the
//! load / refresh-task / URI-inspection side effects so the host controls
//! the lifecycle and no timer leaks from a constructor.
//!
//! Mutation discipline: the credential lock is never held across an await
//! point. A refresh and an in-flight exchange may overlap; the later write
//! wins.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AuthRequest;
use crate::constants::{OOB_REDIRECT_URI, REFRESH_INTERVAL};
use crate::credentials::{Credential, now_millis};
use crate::error::{Error, Result};
use crate::grant::{AuthorizationResult, GrantFlow};
use crate::refresh::spawn_refresh_task;
use crate::store::KeyValueStore;
use crate::surface::{Consent, SignIn, Surface, await_consent};
use crate::token::TokenEndpoint;

/// Observer invoked with the current access token after every load and save.
type TokenObserver = Box<dyn Fn(Option<&str>) + Send + Sync>;

/// Manages one identity's credential: acquisition, persistence, refresh,
/// invalidation.
pub struct CredentialManager {
    request: AuthRequest,
    flow: GrantFlow,
    store: Arc<dyn KeyValueStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    surface: Surface,
    credential: RwLock<Option<Credential>>,
    on_token_change: TokenObserver,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl CredentialManager {
    /// Validate the request and wire dependencies. No storage or network
    /// access happens here; a missing required parameter fails immediately.
    ///
    /// An embedded-window host that supplies no redirect URI gets the
    /// out-of-band loopback URI.
    pub fn new(
        mut request: AuthRequest,
        flow: GrantFlow,
        store: Arc<dyn KeyValueStore>,
        endpoint: Arc<dyn TokenEndpoint>,
        surface: Surface,
    ) -> Result<Self> {
        if request.redirect_uri.is_none() && matches!(surface, Surface::Window(_)) {
            request.redirect_uri = Some(OOB_REDIRECT_URI.to_owned());
        }
        request.validate(flow)?;
        Ok(Self {
            request,
            flow,
            store,
            endpoint,
            surface,
            credential: RwLock::new(None),
            on_token_change: Box::new(|_| {}),
            refresh_task: Mutex::new(None),
        })
    }

    /// Set the token-change observer (default: no-op).
    pub fn with_token_observer(
        mut self,
        observer: impl Fn(Option<&str>) + Send + Sync + 'static,
    ) -> Self {
        self.on_token_change = Box::new(observer);
        self
    }

    /// Bring the manager online: load the persisted credential (notifying
    /// the observer), spawn the periodic refresh task, and consume any
    /// authorization result already present in the navigation target.
    ///
    /// An exchange failure for a URI-borne code is logged and swallowed;
    /// interactive retry remains available to the user.
    pub async fn start(self: &Arc<Self>) {
        self.load_credentials();

        let task = spawn_refresh_task(self, REFRESH_INTERVAL);
        if let Some(previous) = self.refresh_task().replace(task) {
            previous.abort();
        }

        if let Err(e) = self.handle_code_in_uri().await {
            warn!(error = %e, "authorization result in URI could not be consumed");
        }
    }

    /// Abort the background refresh task. Also runs on drop.
    pub fn stop(&self) {
        if let Some(task) = self.refresh_task().take() {
            task.abort();
        }
    }

    /// The current access token, if signed in.
    pub fn get_token(&self) -> Option<String> {
        self.credential_read()
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    /// The authorization endpoint URI for this configuration.
    pub fn auth_uri(&self) -> String {
        self.flow.auth_uri(&self.request)
    }

    /// Load the persisted credential from the flow's storage slot.
    ///
    /// A missing slot, a malformed record, or a record without the tokens
    /// the flow requires all degrade leniently to "no credential" - never an
    /// error. The observer is invoked with the result.
    pub fn load_credentials(&self) {
        let loaded = self
            .store
            .get(self.flow.storage_key())
            .and_then(|raw| serde_json::from_str::<Credential>(&raw).ok())
            .filter(|c| !c.access_token.is_empty())
            .filter(|c| {
                !self.flow.supports_refresh()
                    || c.refresh_token.as_deref().is_some_and(|r| !r.is_empty())
            });
        if loaded.is_some() {
            debug!("loaded persisted credential");
        }
        *self.credential_write() = loaded;
        self.notify();
    }

    /// Write the credential through to storage: the serialized record when
    /// signed in, slot removal when signed out. Storage failures are logged
    /// and swallowed - the in-memory credential stays authoritative. The
    /// observer is invoked with the current token.
    fn save_credentials(&self) {
        let key = self.flow.storage_key();
        let snapshot = self.credential_read().clone();
        let outcome = match &snapshot {
            Some(credential) => serde_json::to_string(credential)
                .map_err(|e| Error::Io(format!("serializing credential: {e}")))
                .and_then(|record| self.store.set(key, &record)),
            None => self.store.remove(key),
        };
        if let Err(e) = outcome {
            warn!(error = %e, "failed to persist credential");
        }
        self.notify();
    }

    /// Drive an interactive sign-in through the configured surface.
    ///
    /// Fails with `Offline` before any state transition when connectivity is
    /// known to be unavailable. Web hosts navigate away and resume on the
    /// next page load; embedded-window hosts block here until the consent
    /// window resolves.
    pub async fn sign_in(&self) -> Result<SignIn> {
        if !self.surface.is_online() {
            return Err(Error::Offline);
        }
        let auth_uri = self.auth_uri();
        match &self.surface {
            Surface::Redirect(navigator) => {
                navigator.navigate(&auth_uri);
                Ok(SignIn::Redirected)
            }
            Surface::Window(host) => {
                let mut window = host.open(&auth_uri).await?;
                match await_consent(window.as_mut()).await? {
                    Consent::Code(code) => {
                        self.exchange_code(&code).await?;
                        Ok(SignIn::Completed)
                    }
                    Consent::Dismissed => Ok(SignIn::Dismissed),
                }
            }
        }
    }

    /// Exchange an authorization code for a credential.
    ///
    /// On success the whole in-memory credential is replaced by the response
    /// body, stamped with the exchange time, and persisted; a web host is
    /// then navigated back to the redirect URI to strip the code from the
    /// visible URI. On failure the held credential is untouched.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let form = [
            ("client_id".to_owned(), self.request.client_id.clone()),
            ("client_secret".to_owned(), self.client_secret()),
            (
                "redirect_uri".to_owned(),
                self.request.redirect_uri.clone().unwrap_or_default(),
            ),
            ("grant_type".to_owned(), "authorization_code".to_owned()),
            ("code".to_owned(), code.to_owned()),
        ];
        let response = self.endpoint.post(&form).await?;
        let Some(mut credential) = response.into_credential() else {
            return Err(Error::Exchange(
                "token response carried no access token".into(),
            ));
        };
        credential.created_at = Some(now_millis());
        *self.credential_write() = Some(credential);
        self.save_credentials();
        info!("authorization code exchanged");

        if let Surface::Redirect(navigator) = &self.surface {
            if let Some(redirect_uri) = &self.request.redirect_uri {
                navigator.navigate(redirect_uri);
            }
        }
        Ok(())
    }

    /// Inspect the navigation target for an authorization result and consume
    /// it: exchange a code, or store an Implicit-flow token directly. The
    /// web host is navigated back to the redirect URI either way, stripping
    /// the code or fragment from the visible URI.
    ///
    /// Returns whether a result was found. Only meaningful on a redirect
    /// surface; an embedded-window host has no navigation context.
    pub async fn handle_code_in_uri(&self) -> Result<bool> {
        let Surface::Redirect(navigator) = &self.surface else {
            return Ok(false);
        };
        match self.flow.extract_result(&navigator.current_uri()) {
            Some(AuthorizationResult::Code(code)) => {
                self.exchange_code(&code).await?;
                Ok(true)
            }
            Some(AuthorizationResult::Token(mut credential)) => {
                credential.created_at = Some(now_millis());
                *self.credential_write() = Some(credential);
                self.save_credentials();
                info!("implicit grant consumed from URI fragment");
                if let Some(redirect_uri) = &self.request.redirect_uri {
                    navigator.navigate(redirect_uri);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Refresh the access token once.
    ///
    /// No-op without a credential or on a flow without refresh support. On
    /// success only the access token is replaced; every other field is
    /// preserved. Failure - transport, provider rejection, or a body without
    /// an access token - is swallowed: logged, credential untouched,
    /// observer not invoked. A single failed refresh never signs the user
    /// out.
    pub async fn refresh_access_token(&self) {
        if !self.flow.supports_refresh() {
            return;
        }
        let Some(refresh_token) = self
            .credential_read()
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
        else {
            return;
        };
        let form = [
            ("client_id".to_owned(), self.request.client_id.clone()),
            ("client_secret".to_owned(), self.client_secret()),
            ("grant_type".to_owned(), "refresh_token".to_owned()),
            ("refresh_token".to_owned(), refresh_token),
        ];
        match self.endpoint.post(&form).await {
            Ok(response) => match response.access_token.filter(|t| !t.is_empty()) {
                Some(access_token) => {
                    if let Some(credential) = self.credential_write().as_mut() {
                        credential.access_token = access_token;
                    }
                    self.save_credentials();
                    debug!("access token refreshed");
                }
                None => {
                    warn!("refresh response carried no access token, keeping current credential");
                }
            },
            Err(e) => {
                warn!(error = %e, "token refresh failed, keeping current credential");
            }
        }
    }

    /// Sign out: clear the credential and its storage slot, notify the
    /// observer with `None`. Cannot fail.
    pub fn sign_out(&self) {
        *self.credential_write() = None;
        self.save_credentials();
        info!("signed out");
    }

    fn client_secret(&self) -> String {
        self.request
            .client_secret
            .as_ref()
            .map(|s| s.expose().clone())
            .unwrap_or_default()
    }

    fn notify(&self) {
        let guard = self.credential_read();
        (self.on_token_change)(guard.as_ref().map(|c| c.access_token.as_str()));
    }

    // Lock accessors absorb poisoning: a panicked writer cannot make every
    // later lifecycle call panic too.
    fn credential_read(&self) -> RwLockReadGuard<'_, Option<Credential>> {
        self.credential.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn credential_write(&self) -> RwLockWriteGuard<'_, Option<Credential>> {
        self.credential.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.refresh_task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CredentialManager {
    fn drop(&mut self) {
        self.stop();
    }
}
