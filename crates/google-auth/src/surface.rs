//! Interactive authorization surface
//!
//! Two host variants present the consent screen. A web host navigates the
//! whole page to the authorization URI; the flow resumes on the next page
//! load when the manager inspects the current URI. An embedded-window host
//! (Electron-style) opens a child browser window and the manager watches its
//! title stream for the provider's sentinel strings.
//!
//! Consent state machine: Idle -> AwaitingUserConsent -> CodeReceived |
//! Denied | Dismissed. A `Success` title is consumed at most once even when
//! duplicate title events arrive. A window that never resolves its title
//! stream suspends the sign-in future indefinitely - there is no timeout,
//! matching the surface's contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Whole-page navigation surface (web host).
pub trait Navigator: Send + Sync {
    /// Navigate the page; the current execution context does not survive.
    fn navigate(&self, uri: &str);

    /// The page URI the process was loaded with, including query/fragment.
    fn current_uri(&self) -> String;

    /// Whether network connectivity is known to be available.
    fn is_online(&self) -> bool {
        true
    }
}

/// An open consent window whose title reports the authorization outcome.
#[async_trait]
pub trait AuthWindow: Send {
    /// Next observed title. `None` means the window closed without ever
    /// reaching a sentinel title (the user dismissed it).
    async fn next_title(&mut self) -> Option<String>;

    fn close(&mut self);
}

/// Embedded-window surface (Electron-style host).
#[async_trait]
pub trait WindowHost: Send + Sync {
    /// Open a consent window pointed at the authorization URI.
    async fn open(&self, uri: &str) -> Result<Box<dyn AuthWindow>>;

    /// Whether network connectivity is known to be available.
    fn is_online(&self) -> bool {
        true
    }
}

/// The surface variant the manager drives, selected at construction time.
pub enum Surface {
    Redirect(Arc<dyn Navigator>),
    Window(Arc<dyn WindowHost>),
}

impl Surface {
    pub(crate) fn is_online(&self) -> bool {
        match self {
            Surface::Redirect(navigator) => navigator.is_online(),
            Surface::Window(host) => host.is_online(),
        }
    }
}

/// How an interactive sign-in concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignIn {
    /// Code received and exchanged; the credential is now held.
    Completed,
    /// Page navigated to the consent screen; resumption happens on the next
    /// page load via `handle_code_in_uri`.
    Redirected,
    /// Consent window closed without approval or denial.
    Dismissed,
}

/// Outcome of watching a consent window.
#[derive(Debug)]
pub(crate) enum Consent {
    Code(String),
    Dismissed,
}

/// Watch a consent window's titles until a sentinel resolves the flow.
///
/// `Denied...` closes the window and reports denial. `Success code=...`
/// yields the code; returning on the first match guarantees duplicate title
/// events cannot trigger a second exchange.
pub(crate) async fn await_consent(window: &mut dyn AuthWindow) -> Result<Consent> {
    while let Some(title) = window.next_title().await {
        if title.starts_with("Denied") {
            window.close();
            return Err(Error::AccessDenied);
        }
        if title.starts_with("Success") {
            let code = extract_code(&title);
            window.close();
            return match code {
                Some(code) => Ok(Consent::Code(code)),
                None => Err(Error::Exchange(format!(
                    "consent title carried no authorization code: {title}"
                ))),
            };
        }
    }
    Ok(Consent::Dismissed)
}

/// Extract the code from a `Success code=XYZ` title.
fn extract_code(title: &str) -> Option<String> {
    let mut parts = title.split([' ', '=', '&']);
    while let Some(part) = parts.next() {
        if part == "code" {
            return parts.next().filter(|code| !code.is_empty()).map(str::to_owned);
        }
    }
    None
}
