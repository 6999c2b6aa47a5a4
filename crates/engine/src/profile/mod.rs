//! Background profile refresh
//!
//! Keeps the cached profile in step with the backend: refreshes whenever a
//! new token lands in the store and whenever a caller requests it (e.g.
//! after a spin changes the credit balance). A failed refresh keeps the
//! last cached profile; it never logs the user out.

use async_trait::async_trait;
use relay_core::{Profile, Result};
use relay_networking::ConsoleClient;
use relay_persistence::SessionStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn fetch_profile(&self) -> Result<Profile>;
}

#[async_trait]
impl ProfileApi for ConsoleClient {
    async fn fetch_profile(&self) -> Result<Profile> {
        self.get_profile().await
    }
}

/// Refresh the cached profile once. On failure the store is left untouched
/// and the error is returned after logging.
pub async fn refresh_profile<A: ProfileApi + ?Sized>(
    api: &A,
    store: &SessionStore,
) -> Result<Profile> {
    match api.fetch_profile().await {
        Ok(profile) => {
            store.replace_user(profile.clone()).await?;
            debug!(credits = profile.credits, "Profile refreshed");
            Ok(profile)
        }
        Err(e) => {
            warn!("Profile refresh failed, keeping cached profile: {}", e);
            Err(e)
        }
    }
}

/// Handle to the background sync task.
pub struct ProfileSyncHandle {
    cancel: CancellationToken,
    refresh_tx: mpsc::UnboundedSender<()>,
}

impl ProfileSyncHandle {
    /// Ask the task for an out-of-band refresh.
    pub fn request_refresh(&self) {
        let _ = self.refresh_tx.send(());
    }

    /// Clone of the refresh channel, for wiring into other components.
    pub fn refresh_sender(&self) -> mpsc::UnboundedSender<()> {
        self.refresh_tx.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Spawn the sync task. It watches the store's token channel and the
/// refresh channel until stopped.
pub fn spawn_profile_sync(store: Arc<SessionStore>, base_url: String) -> ProfileSyncHandle {
    let cancel = CancellationToken::new();
    let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
    tokio::spawn(sync_loop(store, base_url, cancel.clone(), refresh_rx));
    ProfileSyncHandle { cancel, refresh_tx }
}

async fn sync_loop(
    store: Arc<SessionStore>,
    base_url: String,
    cancel: CancellationToken,
    mut refresh_rx: mpsc::UnboundedReceiver<()>,
) {
    let mut token_rx = store.subscribe_token();

    // A session restored before the task started counts as a fresh token.
    if let Some(token) = store.token() {
        let client = ConsoleClient::new(&base_url, &token);
        let _ = refresh_profile(&client, &store).await;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Profile sync stopped");
                return;
            }
            changed = token_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                let token = token_rx.borrow_and_update().clone();
                if let Some(token) = token {
                    let client = ConsoleClient::new(&base_url, &token);
                    let _ = refresh_profile(&client, &store).await;
                }
            }
            msg = refresh_rx.recv() => {
                if msg.is_none() {
                    return;
                }
                if let Some(token) = store.token() {
                    let client = ConsoleClient::new(&base_url, &token);
                    let _ = refresh_profile(&client, &store).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{Error, Role, UserStatus};
    use relay_persistence::{Database, TokenEncryptor};

    struct MockProfileApi {
        response: std::sync::Mutex<Option<Result<Profile>>>,
    }

    impl MockProfileApi {
        fn returning(result: Result<Profile>) -> Self {
            Self {
                response: std::sync::Mutex::new(Some(result)),
            }
        }
    }

    #[async_trait]
    impl ProfileApi for MockProfileApi {
        async fn fetch_profile(&self) -> Result<Profile> {
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(Error::ApiError("exhausted".into())))
        }
    }

    fn profile(credits: i64) -> Profile {
        Profile {
            id: 7,
            username: "alice".to_string(),
            role: Role::User,
            level: 2,
            status: UserStatus::Active,
            credits,
        }
    }

    async fn logged_in_store() -> Arc<SessionStore> {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let encryptor = Arc::new(TokenEncryptor::from_password("profile-test-key").unwrap());
        let store = Arc::new(SessionStore::open(db, encryptor).await.unwrap());
        store.save("tok-1", profile(30)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn refresh_replaces_cached_profile() {
        let store = logged_in_store().await;
        let api = MockProfileApi::returning(Ok(profile(143)));

        refresh_profile(&api, &store).await.unwrap();
        assert_eq!(store.user().unwrap().credits, 143);
        // Token survives the refresh.
        assert_eq!(store.token().as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_cached_profile() {
        let store = logged_in_store().await;
        let api = MockProfileApi::returning(Err(Error::NetworkError("timeout".into())));

        assert!(refresh_profile(&api, &store).await.is_err());
        assert_eq!(store.user().unwrap().credits, 30);
        assert!(store.session().is_some());
    }
}
