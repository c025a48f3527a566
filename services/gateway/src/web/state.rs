//! services/gateway/src/web/state.rs
//!
//! Defines the gateway's shared state.

use crate::config::Config;
use crate::web::cookies::RequestSession;
use meeting_assistant_core::{AccountsClient, HttpTransport, RouteGuard, SessionManager};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub transport: Arc<dyn HttpTransport>,
    pub guard: RouteGuard,
}

impl AppState {
    pub fn new(config: Arc<Config>, transport: Arc<dyn HttpTransport>) -> Self {
        let guard = RouteGuard::new(config.guard_timeout);
        Self {
            config,
            transport,
            guard,
        }
    }

    /// An accounts client bound to the tokens of one browser request.
    pub fn accounts(&self, session: &RequestSession) -> AccountsClient {
        AccountsClient::new(SessionManager::new(
            self.transport.clone(),
            session.storage().clone(),
        ))
    }

    pub fn secure_cookies(&self) -> bool {
        self.config.cookie_secure
    }
}
