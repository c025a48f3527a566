//! services/gateway/src/web/auth.rs
//!
//! Authentication endpoints for sign-up, sign-in, email verification and
//! sign-out. Every handler works on the session carried by the request's
//! cookies and writes token changes back as `Set-Cookie`.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use meeting_assistant_core::guard::{safe_redirect_target, DASHBOARD_PATH, ONBOARDING_PATH, SIGN_IN_PATH};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::{cookies::RequestSession, rest::ErrorResponse, state::AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Page the visitor originally asked for, from the sign-in redirect.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[schema(value_type = Object)]
    pub user: meeting_assistant_core::User,
    pub redirect_to: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Full name; split into first and last name.
    pub name: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
    pub redirect_to: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/login - Sign in and receive session cookies
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 403, description = "Email not verified yet", body = ErrorResponse),
        (status = 502, description = "Accounts API unavailable", body = ErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Response {
    let session = RequestSession::from_headers(&headers);
    let accounts = state.accounts(&session);

    let result = accounts
        .login(req.email.trim(), &req.password)
        .await
        .map(|(_, user)| {
            let redirect_to = safe_redirect_target(req.next.as_deref()).unwrap_or_else(|| {
                if user.has_completed_onboarding {
                    DASHBOARD_PATH.to_string()
                } else {
                    ONBOARDING_PATH.to_string()
                }
            });
            Json(LoginResponse { user, redirect_to })
        });
    session.finish(state.secure_cookies(), result)
}

/// POST /api/auth/register - Create an account pending email verification
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = RegisterResponse),
        (status = 400, description = "A field is invalid", body = ErrorResponse),
        (status = 502, description = "Accounts API unavailable", body = ErrorResponse)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let session = RequestSession::from_headers(&headers);
    let accounts = state.accounts(&session);

    let result = accounts
        .register(&req.email, &req.password, &req.name)
        .await
        .map(|receipt| {
            let redirect_to = format!("/auth/verify?email={}", urlencoding::encode(&receipt.email));
            (
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: receipt.message,
                    email: receipt.email,
                    redirect_to,
                }),
            )
        });
    session.finish(state.secure_cookies(), result)
}

/// POST /api/auth/resend-verification - Send another verification email
#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Verification email sent", body = MessageResponse),
        (status = 400, description = "Unknown or already verified email", body = ErrorResponse)
    )
)]
pub async fn resend_verification_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ResendVerificationRequest>,
) -> Response {
    let session = RequestSession::from_headers(&headers);
    let result = state
        .accounts(&session)
        .resend_verification(req.email.trim())
        .await
        .map(|message| {
            Json(MessageResponse {
                message,
                redirect_to: None,
            })
        });
    session.finish(state.secure_cookies(), result)
}

/// GET /api/auth/verify-email/{token} - Confirm an email address
#[utoipa::path(
    get,
    path = "/api/auth/verify-email/{token}",
    params(("token" = String, Path, description = "64-character verification token from the email link")),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Malformed, unknown or used token", body = ErrorResponse)
    )
)]
pub async fn verify_email_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Response {
    let session = RequestSession::from_headers(&headers);
    let result = state
        .accounts(&session)
        .verify_email(&token)
        .await
        .map(|message| {
            Json(MessageResponse {
                message,
                redirect_to: Some(SIGN_IN_PATH.to_string()),
            })
        });
    session.finish(state.secure_cookies(), result)
}

/// POST /api/auth/logout - Sign out and expire the session cookies
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Signed out (also when no session existed)", body = MessageResponse)
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let session = RequestSession::from_headers(&headers);
    state.accounts(&session).logout().await;

    let body = Json(MessageResponse {
        message: "Signed out".to_string(),
        redirect_to: Some(SIGN_IN_PATH.to_string()),
    });
    session.finish(state.secure_cookies(), Ok(body))
}

/// GET /api/auth/me - The signed-in user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user record from the accounts API"),
        (status = 401, description = "Session expired", body = ErrorResponse)
    )
)]
pub async fn me_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let session = RequestSession::from_headers(&headers);
    let result = state.accounts(&session).current_user().await.map(Json);
    session.finish(state.secure_cookies(), result)
}
