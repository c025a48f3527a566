//! services/gateway/src/web/middleware.rs
//!
//! Route-protection middleware for the page routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use meeting_assistant_core::Navigation;
use std::sync::Arc;
use tracing::debug;

use crate::web::{cookies::RequestSession, state::AppState};

/// Middleware that runs the route guard for every navigation it wraps.
///
/// Allowed navigations continue to the page with the fetched user (if any)
/// inserted into request extensions. Redirects become `303 See Other`.
/// Session cookies changed by the check (refreshed or cleared) are written
/// to whichever response goes out.
pub async fn route_guard(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Build the session context from the request cookies
    let session = RequestSession::from_headers(req.headers());
    let accounts = state.accounts(&session);

    // 2. Decide
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let navigation = state
        .guard
        .check(&path, query.as_deref(), session.storage(), &accounts)
        .await;
    debug!("Navigation to {}: {:?}", path, navigation);

    // 3. Continue or redirect
    let mut response = match navigation {
        Navigation::Allow(user) => {
            if let Some(user) = user {
                req.extensions_mut().insert(user);
            }
            next.run(req).await
        }
        Navigation::Redirect(location) => Redirect::to(&location).into_response(),
    };

    // 4. Persist any token changes
    session.write_cookies(&mut response, state.secure_cookies());
    response
}
