//! crates/meeting_assistant_core/src/guard.rs
//!
//! Navigation-time route protection. Decides, per requested path, whether the
//! navigation proceeds or is redirected to sign-in, onboarding or the
//! dashboard. Nothing is cached: every gated navigation fetches the user once
//! so the onboarding flag is always current.

use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::User;
use crate::error::AuthError;
use crate::ports::UserSource;
use crate::storage::{SessionState, SessionStorage};

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ONBOARDING_PATH: &str = "/onboarding";

/// Query parameter carrying the originally requested location to sign-in.
pub const NEXT_PARAM: &str = "next";

pub const DEFAULT_USER_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// What a path demands of the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// No session required.
    Public,
    /// Public, but signed-in visitors are sent to the dashboard.
    SignIn,
    /// A session is required; this is the onboarding flow itself.
    RequiresSession,
    /// A session and completed onboarding are required.
    RequiresOnboarding,
}

impl RouteAccess {
    pub fn classify(path: &str) -> Self {
        if under(path, DASHBOARD_PATH) {
            RouteAccess::RequiresOnboarding
        } else if under(path, ONBOARDING_PATH) {
            RouteAccess::RequiresSession
        } else if path == SIGN_IN_PATH || path == "/auth/signin/" {
            RouteAccess::SignIn
        } else {
            RouteAccess::Public
        }
    }
}

/// `path` equals `root` or is a descendant segment of it.
fn under(path: &str, root: &str) -> bool {
    path.strip_prefix(root)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Proceed. Carries the user when one was fetched for the decision.
    Allow(Option<User>),
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    user_fetch_timeout: Duration,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(DEFAULT_USER_FETCH_TIMEOUT)
    }
}

impl RouteGuard {
    pub fn new(user_fetch_timeout: Duration) -> Self {
        Self { user_fetch_timeout }
    }

    /// Decides the fate of a navigation to `path` (with optional raw `query`).
    ///
    /// A corrupt session, or one whose user cannot be fetched in time, is
    /// cleared from `storage` before redirecting to sign-in.
    pub async fn check(
        &self,
        path: &str,
        query: Option<&str>,
        storage: &SessionStorage,
        users: &dyn UserSource,
    ) -> Navigation {
        let access = RouteAccess::classify(path);
        if access == RouteAccess::Public {
            return Navigation::Allow(None);
        }

        let state = storage.load().unwrap_or_else(|e| {
            warn!("Could not read session storage: {}", e);
            SessionState::Corrupt
        });
        if state == SessionState::Corrupt {
            warn!("Inconsistent session tokens, clearing session");
            clear(storage);
        }

        if !state.is_active() {
            return match access {
                RouteAccess::SignIn => Navigation::Allow(None),
                _ => {
                    debug!("No session for {}, redirecting to sign-in", path);
                    Navigation::Redirect(sign_in_location(path, query))
                }
            };
        }

        if access == RouteAccess::SignIn {
            return Navigation::Redirect(DASHBOARD_PATH.to_string());
        }

        let user = match tokio::time::timeout(self.user_fetch_timeout, users.current_user()).await {
            Ok(Ok(user)) => user,
            Ok(Err(e)) => return self.reject(path, query, storage, e),
            Err(_) => return self.reject(path, query, storage, AuthError::SessionExpired),
        };

        match (user.has_completed_onboarding, access) {
            (false, RouteAccess::RequiresOnboarding) => {
                debug!("User {} has not onboarded, redirecting", user.id);
                Navigation::Redirect(ONBOARDING_PATH.to_string())
            }
            (true, RouteAccess::RequiresSession) => Navigation::Redirect(DASHBOARD_PATH.to_string()),
            _ => Navigation::Allow(Some(user)),
        }
    }

    fn reject(
        &self,
        path: &str,
        query: Option<&str>,
        storage: &SessionStorage,
        cause: AuthError,
    ) -> Navigation {
        warn!("Could not load user for {}: {}; signing out", path, cause);
        clear(storage);
        Navigation::Redirect(sign_in_location(path, query))
    }
}

fn clear(storage: &SessionStorage) {
    if let Err(e) = storage.clear() {
        warn!("Failed to clear session: {}", e);
    }
}

/// `/auth/signin?next=<encoded path?query>`.
pub fn sign_in_location(path: &str, query: Option<&str>) -> String {
    let target = match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    format!(
        "{}?{}={}",
        SIGN_IN_PATH,
        NEXT_PARAM,
        urlencoding::encode(&target)
    )
}

/// Accepts a post-login redirect target only if it stays on this site.
pub fn safe_redirect_target(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    local.then(|| next.to_string())
}
