//! Durable session store
//!
//! Single source of truth for authentication. Holds the current
//! `{token, user}` pair in memory and mirrors it into a single SQLite row,
//! with the token encrypted at rest. Token and user are always written
//! together; a partial session is unrepresentable.

use crate::encryption::TokenEncryptor;
use crate::sqlite::{self, Database};
use relay_core::{Error, Profile, Result, Session};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Atomic store of the authenticated session
pub struct SessionStore {
    db: Arc<Database>,
    encryptor: Arc<TokenEncryptor>,
    session: RwLock<Option<Session>>,
    token_tx: watch::Sender<Option<String>>,
}

impl SessionStore {
    /// Open the store, restoring any persisted session.
    ///
    /// A record that fails to decrypt or parse is treated as "no session";
    /// startup never fails because of a stale or corrupt record.
    pub async fn open(db: Arc<Database>, encryptor: Arc<TokenEncryptor>) -> Result<Self> {
        let restored = match sqlite::load_session(db.pool()).await {
            Ok(Some(record)) => {
                let token = encryptor.decrypt(&record.token);
                let user = serde_json::from_str::<Profile>(&record.user_json);
                match (token, user) {
                    (Ok(token), Ok(user)) => {
                        debug!("Restored session for user: {}", user.username);
                        Some(Session::new(token, user))
                    }
                    _ => {
                        debug!("Persisted session unreadable, starting logged out");
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read persisted session: {}", e);
                None
            }
        };

        let (token_tx, _) = watch::channel(restored.as_ref().map(|s| s.token.clone()));

        Ok(Self {
            db,
            encryptor,
            session: RwLock::new(restored),
            token_tx,
        })
    }

    /// Save a new session: in-memory state first, then one combined record.
    pub async fn save(&self, token: &str, user: Profile) -> Result<()> {
        let session = Session::new(token, user);
        let user_json = serde_json::to_string(&session.user)?;
        let encrypted = self.encryptor.encrypt(token)?;

        {
            let mut guard = self
                .session
                .write()
                .map_err(|_| Error::StorageError("session lock poisoned".to_string()))?;
            *guard = Some(session);
        }
        let _ = self.token_tx.send(Some(token.to_string()));

        sqlite::save_session(self.db.pool(), &encrypted, &user_json).await?;
        info!("Session saved");
        Ok(())
    }

    /// Log out: reset memory and remove the persisted record.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut guard = self
                .session
                .write()
                .map_err(|_| Error::StorageError("session lock poisoned".to_string()))?;
            *guard = None;
        }
        let _ = self.token_tx.send(None);

        sqlite::clear_session(self.db.pool()).await?;
        info!("Session cleared");
        Ok(())
    }

    /// Replace the cached profile, keeping the token, and re-persist the
    /// combined record. Used by profile reconciliation to refresh
    /// server-mutable fields such as credits. No-op when logged out.
    pub async fn replace_user(&self, user: Profile) -> Result<()> {
        let token = {
            let mut guard = self
                .session
                .write()
                .map_err(|_| Error::StorageError("session lock poisoned".to_string()))?;
            match guard.as_mut() {
                Some(session) => {
                    session.user = user.clone();
                    session.token.clone()
                }
                None => {
                    debug!("replace_user with no active session, ignoring");
                    return Ok(());
                }
            }
        };

        let user_json = serde_json::to_string(&user)?;
        let encrypted = self.encryptor.encrypt(&token)?;
        sqlite::save_session(self.db.pool(), &encrypted, &user_json).await?;
        Ok(())
    }

    /// Current session, if logged in
    pub fn session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    /// Current bearer token, if logged in
    pub fn token(&self) -> Option<String> {
        self.session
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.token.clone()))
    }

    /// Current cached profile, if logged in
    pub fn user(&self) -> Option<Profile> {
        self.session
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.user.clone()))
    }

    /// Derived, read-only projection: true iff the cached profile is an admin
    pub fn is_admin(&self) -> bool {
        self.user().map(|u| u.is_admin()).unwrap_or(false)
    }

    /// Watch the token for transitions (login, logout, token replacement)
    pub fn subscribe_token(&self) -> watch::Receiver<Option<String>> {
        self.token_tx.subscribe()
    }
}
