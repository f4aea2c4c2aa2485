//! Google OAuth2 credential lifecycle manager
//!
//! Client-side helper for the OAuth2 Authorization Code flow (and the legacy
//! Implicit flow) against Google's identity endpoints. Owns the whole token
//! lifecycle: interactive acquisition, local persistence, periodic refresh,
//! and sign-out. The environment (storage, navigation, consent window, token
//! endpoint) is injected through traits so hosts and tests can substitute
//! their own implementations.
//!
//! Credential flow:
//! 1. Host builds an [`AuthRequest`] and a [`CredentialManager`]
//! 2. `manager.start()` loads the persisted credential, spawns the refresh
//!    task, and consumes any authorization result in the current URI
//! 3. `manager.sign_in()` drives the interactive consent surface
//! 4. A received authorization code is exchanged via the token endpoint and
//!    the credential is written through to storage
//! 5. The background task refreshes the access token every five minutes
//! 6. `manager.sign_out()` clears the credential and the storage slot

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod grant;
pub mod manager;
pub mod refresh;
pub mod store;
pub mod surface;
pub mod token;

pub use config::{AuthRequest, Scopes};
pub use credentials::Credential;
pub use error::{Error, Result};
pub use grant::{AuthorizationResult, GrantFlow};
pub use manager::CredentialManager;
pub use refresh::spawn_refresh_task;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use surface::{AuthWindow, Navigator, SignIn, Surface, WindowHost};
pub use token::{HttpTokenEndpoint, TokenEndpoint, TokenResponse};
