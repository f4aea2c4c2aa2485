//! Error types for the credential lifecycle

/// Errors from credential lifecycle operations.
///
/// `Configuration` is returned synchronously from construction. The
/// interactive errors (`Offline`, `AccessDenied`, `Exchange`) surface from
/// `sign_in` and `exchange_code`. Refresh failures are never surfaced as
/// errors; the manager swallows them and keeps the current credential.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("sign-in not possible while offline")]
    Offline,

    #[error("access denied by user")]
    AccessDenied,

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for credential lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;
