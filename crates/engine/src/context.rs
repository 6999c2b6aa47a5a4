//! Console context: owns the session store and background sync
//!
//! Everything hangs off an explicit [`ConsoleContext`] handed to the
//! components that need it. There is no global state; two contexts in one
//! process stay fully independent, which is also what makes the engine
//! testable against an in-memory database.

use crate::checkin::CheckInEngine;
use crate::profile::{spawn_profile_sync, ProfileSyncHandle};
use relay_core::Result;
use relay_networking::{AuthBridge, ConsoleClient};
use relay_persistence::{derive_machine_key, Database, SessionStore, TokenEncryptor};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct ConsoleContext {
    store: Arc<SessionStore>,
    base_url: String,
    profile_sync: ProfileSyncHandle,
}

impl ConsoleContext {
    /// Open the console against `data_dir`, restoring any persisted session
    /// and starting the background profile sync.
    pub async fn init(data_dir: &Path, base_url: &str) -> Result<Self> {
        let key = derive_machine_key()?;
        let encryptor = Arc::new(TokenEncryptor::new(&key)?);
        let db = Arc::new(Database::connect(&data_dir.join("console.db")).await?);
        Self::init_with_database(db, encryptor, base_url).await
    }

    /// Wire a context over an already-open database. Tests use this with
    /// [`Database::connect_in_memory`].
    pub async fn init_with_database(
        db: Arc<Database>,
        encryptor: Arc<TokenEncryptor>,
        base_url: &str,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let store = Arc::new(SessionStore::open(db, encryptor).await?);
        let profile_sync = spawn_profile_sync(store.clone(), base_url.clone());

        info!(
            logged_in = store.session().is_some(),
            "Console context initialized"
        );
        Ok(Self {
            store,
            base_url,
            profile_sync,
        })
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bridge for the out-of-process login flow, feeding this context's
    /// session store.
    pub fn auth_bridge(&self) -> AuthBridge {
        AuthBridge::new(self.store.clone(), &self.base_url)
    }

    /// Client bound to the current session token, or `None` when logged out.
    pub fn client(&self) -> Option<ConsoleClient> {
        self.store
            .token()
            .map(|token| ConsoleClient::new(&self.base_url, &token))
    }

    /// Check-in engine for the current session, wired to ping the profile
    /// sync after each successful spin. `None` when logged out.
    pub fn check_in_engine(&self) -> Option<CheckInEngine<ConsoleClient>> {
        self.client().map(|client| {
            CheckInEngine::new(client).with_refresh_notifier(self.profile_sync.refresh_sender())
        })
    }

    pub fn request_profile_refresh(&self) {
        self.profile_sync.request_refresh();
    }

    /// Stop the background sync. The store itself needs no teardown.
    pub fn shutdown(&self) {
        self.profile_sync.stop();
    }
}
