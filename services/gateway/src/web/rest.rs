//! services/gateway/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, the shared error
//! payload and the stateless REST endpoints.

use axum::{http::StatusCode, response::Json};
use meeting_assistant_core::{evaluate_password, guard::SIGN_IN_PATH, AuthError};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};

use crate::web::{auth, onboarding};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::register_handler,
        auth::resend_verification_handler,
        auth::verify_email_handler,
        auth::logout_handler,
        auth::me_handler,
        password_strength_handler,
        onboarding::complete_onboarding_handler,
        onboarding::save_preferences_handler,
        onboarding::oauth_handler,
    ),
    components(
        schemas(
            ErrorResponse,
            PasswordStrengthRequest,
            PasswordStrengthResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::RegisterResponse,
            auth::ResendVerificationRequest,
            auth::MessageResponse,
            onboarding::OnboardingResponse,
            onboarding::OAuthResponse,
        )
    ),
    tags(
        (name = "Meeting Assistant Gateway", description = "Sign-up, sign-in and onboarding on top of the accounts API.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Payload
//=========================================================================================

/// The display-safe body returned for every failed operation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Form field to show the message next to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub requires_verification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Where the browser should go next, e.g. sign-in after the session expired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

/// Logs an `AuthError` and converts it into a status and display-safe body.
pub fn reject(err: AuthError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        AuthError::Validation { .. } => StatusCode::BAD_REQUEST,
        AuthError::RequiresVerification { .. } => StatusCode::FORBIDDEN,
        AuthError::InvalidCredentials | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
        AuthError::ProviderUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
        AuthError::Server { status, .. } if (400..500).contains(status) => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
        }
        AuthError::Server { .. } | AuthError::Port(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    let body = ErrorResponse {
        error: err.display_message(),
        field: err.field().map(|field| field.to_string()),
        requires_verification: matches!(err, AuthError::RequiresVerification { .. }),
        email: match &err {
            AuthError::RequiresVerification { email } => email.clone(),
            _ => None,
        },
        redirect_to: matches!(err, AuthError::SessionExpired).then(|| SIGN_IN_PATH.to_string()),
    };
    (status, Json(body))
}

//=========================================================================================
// Password Strength
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct PasswordStrengthRequest {
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct PasswordStrengthResponse {
    /// 0 to 5.
    pub score: u8,
    pub label: String,
    #[schema(value_type = Object)]
    pub criteria: meeting_assistant_core::password::Criteria,
}

/// Scores a candidate password for the sign-up form's strength meter.
#[utoipa::path(
    post,
    path = "/api/auth/password-strength",
    request_body = PasswordStrengthRequest,
    responses(
        (status = 200, description = "Advisory strength score", body = PasswordStrengthResponse)
    )
)]
pub async fn password_strength_handler(
    Json(req): Json<PasswordStrengthRequest>,
) -> Json<PasswordStrengthResponse> {
    let strength = evaluate_password(&req.password);
    Json(PasswordStrengthResponse {
        score: strength.score,
        label: strength.label.to_string(),
        criteria: strength.criteria,
    })
}
