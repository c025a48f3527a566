pub mod auth;
pub mod cookies;
pub mod middleware;
pub mod onboarding;
pub mod pages;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::route_guard;
pub use state::AppState;

/// Builds the gateway's router: guarded pages, open pages and the JSON API.
pub fn router(state: Arc<AppState>) -> Router {
    // Pages the route guard decides on
    let guarded_pages = Router::new()
        .route("/dashboard", get(pages::dashboard_page))
        .route("/dashboard/{*rest}", get(pages::dashboard_page))
        .route("/onboarding", get(pages::onboarding_page))
        .route("/onboarding/{*rest}", get(pages::onboarding_page))
        .route("/auth/signin", get(pages::sign_in_page))
        .route("/auth/register", get(pages::register_page))
        .route("/auth/verify", get(pages::verify_page))
        .route("/auth/verify-email/{token}", get(pages::verify_email_page))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            route_guard,
        ));

    let api = Router::new()
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route(
            "/api/auth/resend-verification",
            post(auth::resend_verification_handler),
        )
        .route(
            "/api/auth/verify-email/{token}",
            get(auth::verify_email_handler),
        )
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/me", get(auth::me_handler))
        .route(
            "/api/auth/password-strength",
            post(rest::password_strength_handler),
        )
        .route(
            "/api/onboarding/complete",
            post(onboarding::complete_onboarding_handler),
        )
        .route(
            "/api/onboarding/preferences",
            post(onboarding::save_preferences_handler),
        )
        .route("/api/oauth/{provider}", get(onboarding::oauth_handler));

    Router::new()
        .route("/", get(pages::landing_page))
        .merge(guarded_pages)
        .merge(api)
        .with_state(state)
}
