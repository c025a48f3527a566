//! services/gateway/src/web/onboarding.rs
//!
//! Endpoints behind the onboarding flow: calendar connect, preferences and
//! completion.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use meeting_assistant_core::{guard::DASHBOARD_PATH, AuthResult, OAuthProvider, Preferences, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::{cookies::RequestSession, rest::ErrorResponse, state::AppState};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct OnboardingResponse {
    #[schema(value_type = Object)]
    pub user: User,
    pub redirect_to: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct OAuthResponse {
    pub authorization_url: String,
}

/// POST /api/onboarding/complete - Finish onboarding
#[utoipa::path(
    post,
    path = "/api/onboarding/complete",
    responses(
        (status = 200, description = "Onboarding completed", body = OnboardingResponse),
        (status = 401, description = "Session expired", body = ErrorResponse)
    )
)]
pub async fn complete_onboarding_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let session = RequestSession::from_headers(&headers);
    let accounts = state.accounts(&session);

    let result: AuthResult<_> = async {
        let mut user = accounts.current_user().await?;
        accounts.complete_onboarding(&mut user).await?;
        Ok(Json(OnboardingResponse {
            user,
            redirect_to: DASHBOARD_PATH.to_string(),
        }))
    }
    .await;
    session.finish(state.secure_cookies(), result)
}

/// POST /api/onboarding/preferences - Save working hours and meeting preferences
#[utoipa::path(
    post,
    path = "/api/onboarding/preferences",
    request_body(content_type = "application/json", description = "workingHours {start, end} as HH:MM, workDays, preferredMeetingDuration in minutes."),
    responses(
        (status = 204, description = "Preferences saved"),
        (status = 400, description = "Preferences are inconsistent", body = ErrorResponse),
        (status = 401, description = "Session expired", body = ErrorResponse)
    )
)]
pub async fn save_preferences_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(preferences): Json<Preferences>,
) -> Response {
    let session = RequestSession::from_headers(&headers);
    let result = state
        .accounts(&session)
        .save_preferences(&preferences)
        .await
        .map(|_| StatusCode::NO_CONTENT);
    session.finish(state.secure_cookies(), result)
}

/// GET /api/oauth/{provider} - Start connecting a calendar provider
#[utoipa::path(
    get,
    path = "/api/oauth/{provider}",
    params(("provider" = String, Path, description = "`microsoft` or `google`")),
    responses(
        (status = 200, description = "Consent page to redirect the browser to", body = OAuthResponse),
        (status = 501, description = "Provider not available", body = ErrorResponse)
    )
)]
pub async fn oauth_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(provider): Path<OAuthProvider>,
) -> Response {
    let session = RequestSession::from_headers(&headers);
    let result = state
        .accounts(&session)
        .initiate_oauth(provider)
        .await
        .map(|authorization_url| Json(OAuthResponse { authorization_url }));
    session.finish(state.secure_cookies(), result)
}
