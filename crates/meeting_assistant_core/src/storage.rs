//! crates/meeting_assistant_core/src/storage.rs
//!
//! Session token persistence across the two token stores: the local store
//! read by the HTTP client and the cookie read by the navigation guard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::domain::Session;
use crate::ports::{PortError, PortResult, TokenStore};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Cookie name holding the access token for the navigation guard.
pub const COOKIE_TOKEN_KEY: &str = "token";

/// What the two stores currently say about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Active(Session),
    /// The stores disagree (e.g. cookie without access token). Treated as invalid.
    Corrupt,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }
}

/// Both token stores behind one handle, kept consistent with each other.
#[derive(Clone)]
pub struct SessionStorage {
    local: Arc<dyn TokenStore>,
    cookies: Arc<dyn TokenStore>,
}

impl SessionStorage {
    pub fn new(local: Arc<dyn TokenStore>, cookies: Arc<dyn TokenStore>) -> Self {
        Self { local, cookies }
    }

    /// Storage backed by two fresh `MemoryStore`s.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()), Arc::new(MemoryStore::default()))
    }

    pub fn access_token(&self) -> PortResult<Option<String>> {
        self.local.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> PortResult<Option<String>> {
        self.local.get(REFRESH_TOKEN_KEY)
    }

    pub fn cookie_token(&self) -> PortResult<Option<String>> {
        self.cookies.get(COOKIE_TOKEN_KEY)
    }

    /// Writes every key of `session`. On any failure all keys are removed
    /// again so a half-written session is never observable.
    pub fn persist(&self, session: &Session) -> PortResult<()> {
        let written = self
            .local
            .set(ACCESS_TOKEN_KEY, &session.access_token)
            .and_then(|_| self.local.set(REFRESH_TOKEN_KEY, &session.refresh_token))
            .and_then(|_| self.cookies.set(COOKIE_TOKEN_KEY, &session.access_token));

        if let Err(e) = written {
            warn!("Failed to persist session, rolling back: {}", e);
            if let Err(clear_err) = self.clear() {
                warn!("Rollback left tokens behind: {}", clear_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Replaces the access token in both stores after a refresh.
    pub fn update_access_token(&self, access_token: &str) -> PortResult<()> {
        let written = self
            .local
            .set(ACCESS_TOKEN_KEY, access_token)
            .and_then(|_| self.cookies.set(COOKIE_TOKEN_KEY, access_token));

        if let Err(e) = written {
            warn!("Failed to store refreshed access token, clearing session: {}", e);
            if let Err(clear_err) = self.clear() {
                warn!("Clearing after failed refresh write left tokens behind: {}", clear_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Removes every key from both stores. Every removal is attempted even if
    /// an earlier one fails; the first failure is returned.
    pub fn clear(&self) -> PortResult<()> {
        let results = [
            self.local.remove(ACCESS_TOKEN_KEY),
            self.local.remove(REFRESH_TOKEN_KEY),
            self.cookies.remove(COOKIE_TOKEN_KEY),
        ];
        let mut first_error = None;
        for result in results {
            if let Err(e) = result {
                warn!("Failed to remove session token: {}", e);
                first_error.get_or_insert(e);
            }
        }
        debug!("Session storage cleared");
        first_error.map_or(Ok(()), Err)
    }

    pub fn load(&self) -> PortResult<SessionState> {
        let access = self.access_token()?;
        let refresh = self.refresh_token()?;
        let cookie = self.cookie_token()?;

        Ok(match (access, refresh, cookie) {
            (None, None, None) => SessionState::Absent,
            (Some(access), Some(refresh), Some(cookie)) if access == cookie => {
                SessionState::Active(Session {
                    access_token: access,
                    refresh_token: refresh,
                })
            }
            _ => SessionState::Corrupt,
        })
    }
}

//=========================================================================================
// In-memory Store
//=========================================================================================

/// A `TokenStore` held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Unexpected("token store lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
