//! One-shot login handshake
//!
//! The authorization flow runs out of process: `initiate` hands the caller
//! the provider URL to open, and the completion arrives later as a tagged
//! message on a shared channel. Only a message carrying the login-success
//! discriminant completes the handshake and feeds the session store; all
//! other traffic on the channel is dropped without comment. The handshake is
//! strictly one-shot: once completed, further deliveries are ignored.

use relay_core::{Error, LoginMessage, Profile, Result};
use relay_persistence::SessionStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Authorization path on the relay backend; the provider redirects back here
/// and the resulting page posts the completion message to its opener.
const WEB_LOGIN_PATH: &str = "/auth/linuxdo/web_login";

/// Bridges the out-of-process authorization flow to the session store.
///
/// Lives as long as the owning view; dropping it deregisters the pending
/// handshake so a late completion cannot act on stale state.
pub struct AuthBridge {
    store: Arc<SessionStore>,
    base_url: String,
    pending: Mutex<Option<oneshot::Sender<Profile>>>,
}

/// The caller's half of a pending handshake
pub struct LoginHandshake {
    rx: oneshot::Receiver<Profile>,
}

impl AuthBridge {
    pub fn new(store: Arc<SessionStore>, base_url: &str) -> Self {
        Self {
            store,
            base_url: base_url.trim_end_matches('/').to_string(),
            pending: Mutex::new(None),
        }
    }

    /// Begin a login attempt.
    ///
    /// Returns the authorization URL to open and the pending completion.
    /// A previous unfinished handshake is abandoned; its `wait` resolves
    /// with [`Error::LoginAborted`].
    pub fn initiate(&self) -> (String, LoginHandshake) {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            if pending.replace(tx).is_some() {
                debug!("Replacing abandoned login handshake");
            }
        }
        let url = format!("{}{}", self.base_url, WEB_LOGIN_PATH);
        (url, LoginHandshake { rx })
    }

    /// Handle one message from the completion channel.
    ///
    /// Returns `Ok(true)` when the message completed the handshake,
    /// `Ok(false)` when it was ignored (wrong tag, malformed, or the
    /// handshake already finished). Ignored messages are routine and are
    /// never logged or surfaced.
    pub async fn deliver(&self, payload: serde_json::Value) -> Result<bool> {
        let Some(msg) = LoginMessage::parse(&payload) else {
            return Ok(false);
        };

        // Claim the pending handshake first so the completion is one-shot.
        let Some(tx) = self.pending.lock().ok().and_then(|mut p| p.take()) else {
            return Ok(false);
        };

        if let Err(e) = self.store.save(&msg.token, msg.user.clone()).await {
            // Persistence failed; put the handshake back so a retry can land.
            if let Ok(mut pending) = self.pending.lock() {
                *pending = Some(tx);
            }
            return Err(e);
        }

        info!("Login completed for user: {}", msg.user.username);
        let _ = tx.send(msg.user);
        Ok(true)
    }
}

impl LoginHandshake {
    /// Wait indefinitely for the handshake to complete.
    ///
    /// Resolves with [`Error::LoginAborted`] if the bridge goes away or a
    /// newer handshake replaces this one.
    pub async fn wait(self) -> Result<Profile> {
        self.rx.await.map_err(|_| Error::LoginAborted)
    }

    /// Wait for completion, giving up after `timeout`.
    ///
    /// An abandoned popup otherwise leaves the login view pending forever;
    /// callers that want recovery bound the wait here and get
    /// [`Error::LoginTimeout`].
    pub async fn wait_timeout(self, timeout: Duration) -> Result<Profile> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(profile)) => Ok(profile),
            Ok(Err(_)) => Err(Error::LoginAborted),
            Err(_) => Err(Error::LoginTimeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::LOGIN_SUCCESS_TYPE;
    use relay_persistence::{Database, TokenEncryptor};
    use serde_json::json;

    async fn test_store() -> Arc<SessionStore> {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let encryptor = Arc::new(TokenEncryptor::from_password("bridge-test-key").unwrap());
        Arc::new(SessionStore::open(db, encryptor).await.unwrap())
    }

    fn login_payload(token: &str) -> serde_json::Value {
        json!({
            "type": LOGIN_SUCCESS_TYPE,
            "token": token,
            "user": {
                "id": 7,
                "username": "alice",
                "role": "user",
                "level": 1,
                "status": "active",
                "credits": 30
            }
        })
    }

    #[tokio::test]
    async fn tagged_message_completes_handshake() {
        let store = test_store().await;
        let bridge = AuthBridge::new(store.clone(), "https://relay.example");

        let (url, handshake) = bridge.initiate();
        assert_eq!(url, "https://relay.example/auth/linuxdo/web_login");

        let handled = bridge.deliver(login_payload("tok-1")).await.unwrap();
        assert!(handled);

        let profile = handshake.wait().await.unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(store.token().as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn string_payload_completes_handshake() {
        let store = test_store().await;
        let bridge = AuthBridge::new(store.clone(), "https://relay.example");
        let (_, handshake) = bridge.initiate();

        let payload = serde_json::Value::String(login_payload("tok-str").to_string());
        assert!(bridge.deliver(payload).await.unwrap());

        handshake.wait().await.unwrap();
        assert_eq!(store.token().as_deref(), Some("tok-str"));
    }

    #[tokio::test]
    async fn untagged_message_never_touches_store() {
        let store = test_store().await;
        let bridge = AuthBridge::new(store.clone(), "https://relay.example");
        let (_, _handshake) = bridge.initiate();

        let handled = bridge
            .deliver(json!({"type": "react-devtools", "token": "x"}))
            .await
            .unwrap();
        assert!(!handled);
        assert!(store.session().is_none());

        let handled = bridge.deliver(json!("plain string noise")).await.unwrap();
        assert!(!handled);
        assert!(store.session().is_none());
    }

    #[tokio::test]
    async fn second_delivery_is_ignored() {
        let store = test_store().await;
        let bridge = AuthBridge::new(store.clone(), "https://relay.example");
        let (_, handshake) = bridge.initiate();

        assert!(bridge.deliver(login_payload("tok-first")).await.unwrap());
        assert!(!bridge.deliver(login_payload("tok-second")).await.unwrap());

        handshake.wait().await.unwrap();
        assert_eq!(store.token().as_deref(), Some("tok-first"));
    }

    #[tokio::test]
    async fn wait_timeout_on_abandoned_popup() {
        let store = test_store().await;
        let bridge = AuthBridge::new(store.clone(), "https://relay.example");
        let (_, handshake) = bridge.initiate();

        let result = handshake.wait_timeout(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::LoginTimeout)));
        assert!(store.session().is_none());
    }

    #[tokio::test]
    async fn dropping_bridge_aborts_wait() {
        let store = test_store().await;
        let bridge = AuthBridge::new(store, "https://relay.example");
        let (_, handshake) = bridge.initiate();

        drop(bridge);
        let result = handshake.wait().await;
        assert!(matches!(result, Err(Error::LoginAborted)));
    }
}
