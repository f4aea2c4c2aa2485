//! Google OAuth endpoints and storage slot keys
//!
//! Endpoint URIs match the values the upstream Google documentation assigns
//! to the user-agent flows. The storage keys name the single persistence
//! slot each grant flow uses; the two slots hold different record shapes
//! and are not interoperable.

use std::time::Duration;

/// Authorization endpoint presenting the consent screen
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v4/token";

/// Storage slot for Authorization-Code flow credentials
pub const CREDENTIALS_KEY: &str = "googleCredentials";

/// Storage slot the legacy Implicit flow used (no refresh token in the record)
pub const LEGACY_TOKEN_KEY: &str = "_googleToken";

/// Out-of-band loopback redirect URI for embedded-window hosts
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Period of the background refresh task. Fixed; no backoff, no jitter.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);
