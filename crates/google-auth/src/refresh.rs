//! Periodic background token refresh
//!
//! A fixed-interval task keeps the access token fresh regardless of its age
//! or expiry estimate - no backoff, no jitter. Failures are swallowed by the
//! manager, so a flaky token endpoint degrades to a stale token rather than
//! a forced sign-out; the next tick retries.

use std::sync::Arc;
use std::time::Duration;

use crate::manager::CredentialManager;

/// Spawn the periodic refresh task for a manager.
///
/// The first tick is skipped - the credential was just loaded. The task
/// holds only a weak reference, so it winds down on its own once the last
/// manager handle is dropped; `CredentialManager::stop` aborts it earlier.
pub fn spawn_refresh_task(
    manager: &Arc<CredentialManager>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    let manager = Arc::downgrade(manager);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // interval's first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(manager) = manager.upgrade() else {
                break;
            };
            manager.refresh_access_token().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::config::AuthRequest;
    use crate::error::Result;
    use crate::grant::GrantFlow;
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::surface::{Navigator, Surface};
    use crate::token::{TokenEndpoint, TokenResponse};

    struct CountingEndpoint {
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl TokenEndpoint for CountingEndpoint {
        async fn post(&self, _form: &[(String, String)]) -> Result<TokenResponse> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(TokenResponse {
                access_token: Some(format!("at_{n}")),
                refresh_token: None,
                scope: None,
                token_type: None,
                expires_in: Some(3600),
            })
        }
    }

    struct StaticPage;

    impl Navigator for StaticPage {
        fn navigate(&self, _uri: &str) {}

        fn current_uri(&self) -> String {
            "https://app/cb".into()
        }
    }

    fn manager(endpoint: Arc<CountingEndpoint>) -> Arc<CredentialManager> {
        let store = MemoryStore::new()
            .with_slot("googleCredentials", r#"{"accessToken":"A","refreshToken":"R"}"#);
        let manager = CredentialManager::new(
            AuthRequest::new("c1", "read")
                .client_secret("s1")
                .redirect_uri("https://app/cb"),
            GrantFlow::AuthorizationCode,
            Arc::new(store) as Arc<dyn KeyValueStore>,
            endpoint as Arc<dyn TokenEndpoint>,
            Surface::Redirect(Arc::new(StaticPage)),
        )
        .unwrap();
        manager.load_credentials();
        Arc::new(manager)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_skipped_then_refreshes_each_interval() {
        let endpoint = Arc::new(CountingEndpoint {
            refreshes: AtomicUsize::new(0),
        });
        let manager = manager(Arc::clone(&endpoint));

        let task = spawn_refresh_task(&manager, Duration::from_secs(300));

        // Immediately after spawn nothing has happened - the first tick is
        // consumed without a refresh
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(manager.get_token().as_deref(), Some("at_0"));

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 2);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn task_winds_down_when_the_manager_is_dropped() {
        let endpoint = Arc::new(CountingEndpoint {
            refreshes: AtomicUsize::new(0),
        });
        let manager = manager(Arc::clone(&endpoint));

        let task = spawn_refresh_task(&manager, Duration::from_secs(300));
        drop(manager);

        tokio::time::sleep(Duration::from_secs(301)).await;
        task.await.unwrap();
        assert_eq!(endpoint.refreshes.load(Ordering::SeqCst), 0);
    }
}
