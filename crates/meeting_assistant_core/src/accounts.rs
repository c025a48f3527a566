//! crates/meeting_assistant_core/src/accounts.rs
//!
//! Typed operations against the external accounts API, built on the session
//! manager. Sign-in, registration and verification go out anonymously; every
//! call made on behalf of a signed-in user goes through the refresh pipeline.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::domain::{OAuthProvider, Preferences, RegistrationReceipt, Session, User};
use crate::error::{api_message, first_field_error, AuthError, AuthResult, FormField};
use crate::ports::{ApiRequest, ApiResponse, UserSource};
use crate::session::SessionManager;
use crate::validation::{self, VerificationToken};

pub const LOGIN_PATH: &str = "/api/accounts/login/";
pub const LOGOUT_PATH: &str = "/api/accounts/logout/";
pub const REGISTER_PATH: &str = "/api/accounts/register/";
pub const RESEND_VERIFICATION_PATH: &str = "/api/accounts/resend-verification-email/";
pub const VERIFY_EMAIL_PATH: &str = "/api/accounts/verify-email/";
pub const ME_PATH: &str = "/api/accounts/me/";
pub const COMPLETE_ONBOARDING_PATH: &str = "/api/accounts/complete-onboarding/";
pub const PREFERENCES_PATH: &str = "/api/accounts/preferences/";
pub const MICROSOFT_CONNECT_PATH: &str = "/api/accounts/microsoft/connect/";

const DEFAULT_REGISTRATION_MESSAGE: &str = "Registration successful. Please verify your email.";
const DEFAULT_REGISTRATION_FAILURE: &str = "Registration failed. Please try again.";
const DEFAULT_VERIFIED_MESSAGE: &str = "Email verified successfully! You can now sign in.";

// API field name -> form field, in the order errors are reported.
const FIELD_ERRORS: [(&str, FormField); 5] = [
    ("email", FormField::Email),
    ("login", FormField::Email),
    ("password", FormField::Password),
    ("first_name", FormField::Name),
    ("last_name", FormField::Name),
];

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
    refresh: Option<String>,
    user: Option<User>,
}

#[derive(Deserialize)]
struct ConnectResponse {
    authorization_url: String,
}

/// Client for the accounts API, bound to one session context.
#[derive(Clone)]
pub struct AccountsClient {
    session: SessionManager,
}

impl AccountsClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    //=====================================================================================
    // Sign-in / Sign-out
    //=====================================================================================

    /// Exchanges credentials for a session. On success the tokens are written
    /// to both stores before returning.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<(Session, User)> {
        info!("Attempting login for {}", email);
        let response = self
            .session
            .send_anonymous(ApiRequest::post(
                LOGIN_PATH,
                Some(json!({ "login": email, "password": password })),
            ))
            .await
            .map_err(|e| log_failure("Login", e))?;

        if response.status == 401 {
            let requires_verification = response
                .body
                .get("requires_verification")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if requires_verification {
                let email = response
                    .body
                    .get("email")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| Some(email.to_string()));
                return Err(log_failure("Login", AuthError::RequiresVerification { email }));
            }
            return Err(log_failure("Login", AuthError::InvalidCredentials));
        }
        if !response.is_success() {
            return Err(log_failure("Login", field_or_server_error(&response, None)));
        }

        let body: LoginResponse = serde_json::from_value(response.body)
            .map_err(|e| log_failure("Login", invalid_response(e)))?;
        let (access_token, refresh_token, user) = match (body.token, body.refresh, body.user) {
            (Some(token), Some(refresh), Some(user)) if !token.is_empty() => (token, refresh, user),
            _ => {
                return Err(log_failure(
                    "Login",
                    AuthError::Server {
                        status: response.status,
                        message: "Invalid response from server".to_string(),
                    },
                ))
            }
        };

        let session = Session {
            access_token,
            refresh_token,
        };
        self.session.storage().persist(&session)?;
        info!("Login succeeded for user {}", user.id);
        Ok((session, user))
    }

    /// Clears both token stores, then asks the API to revoke the refresh
    /// token. Revocation is best-effort; the local sign-out always happens.
    pub async fn logout(&self) {
        let storage = self.session.storage();
        let access = storage.access_token().ok().flatten();
        let refresh = storage.refresh_token().ok().flatten();

        if let Err(e) = storage.clear() {
            warn!("Logout could not clear every token: {}", e);
        }

        let (Some(access), Some(refresh)) = (access, refresh) else {
            return;
        };
        let request = ApiRequest::post(LOGOUT_PATH, Some(json!({ "refresh": refresh })))
            .with_bearer(&access);
        match self.session.send_anonymous(request).await {
            Ok(response) if response.is_success() => info!("Refresh token revoked"),
            Ok(response) => warn!("Refresh token revocation returned {}", response.status),
            Err(e) => warn!("Refresh token revocation failed: {}", e),
        }
    }

    //=====================================================================================
    // Registration & Verification
    //=====================================================================================

    /// Registers a new account. The form is checked locally first; nothing is
    /// sent when it is invalid. Tokens are not stored because the email must
    /// be verified before signing in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> AuthResult<RegistrationReceipt> {
        let registration = validation::registration(email, password, name)?;
        let body = serde_json::to_value(&registration).map_err(invalid_response)?;

        let response = self
            .session
            .send_anonymous(ApiRequest::post(REGISTER_PATH, Some(body)))
            .await
            .map_err(|e| log_failure("Registration", e))?;

        if !response.is_success() {
            return Err(log_failure(
                "Registration",
                field_or_server_error(&response, Some(DEFAULT_REGISTRATION_FAILURE)),
            ));
        }

        let message = response
            .body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_REGISTRATION_MESSAGE)
            .to_string();
        let email = response
            .body
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or(registration.email.as_str())
            .to_string();
        info!("Registered {}", email);
        Ok(RegistrationReceipt { message, email })
    }

    pub async fn resend_verification(&self, email: &str) -> AuthResult<String> {
        validation::validate_email(email)?;
        let response = self
            .session
            .send_anonymous(ApiRequest::post(
                RESEND_VERIFICATION_PATH,
                Some(json!({ "email": email })),
            ))
            .await
            .map_err(|e| log_failure("Resend verification", e))?;

        if !response.is_success() {
            return Err(log_failure(
                "Resend verification",
                field_or_server_error(&response, None),
            ));
        }
        Ok(message_or(&response.body, "Verification email sent"))
    }

    /// Verifies an email address. Malformed tokens are rejected locally.
    pub async fn verify_email(&self, raw_token: &str) -> AuthResult<String> {
        let token = VerificationToken::parse(raw_token)
            .map_err(|e| log_failure("Email verification", e))?;

        let response = self
            .session
            .send_anonymous(ApiRequest::get(format!(
                "{}{}",
                VERIFY_EMAIL_PATH,
                token.as_str()
            )))
            .await
            .map_err(|e| log_failure("Email verification", e))?;

        if !response.is_success() {
            return Err(log_failure(
                "Email verification",
                field_or_server_error(&response, None),
            ));
        }
        Ok(message_or(&response.body, DEFAULT_VERIFIED_MESSAGE))
    }

    //=====================================================================================
    // Signed-in Operations
    //=====================================================================================

    pub async fn current_user(&self) -> AuthResult<User> {
        let response = self.session.send(ApiRequest::get(ME_PATH)).await?;
        if !response.is_success() {
            return Err(server_error(&response));
        }
        serde_json::from_value(response.body).map_err(invalid_response)
    }

    /// Marks onboarding as done and flips the flag on `user` in place.
    pub async fn complete_onboarding(&self, user: &mut User) -> AuthResult<()> {
        let response = self
            .session
            .send(ApiRequest::post(COMPLETE_ONBOARDING_PATH, None))
            .await
            .map_err(|e| log_failure("Complete onboarding", e))?;
        if !response.is_success() {
            return Err(log_failure("Complete onboarding", server_error(&response)));
        }
        user.mark_onboarded();
        info!("User {} completed onboarding", user.id);
        Ok(())
    }

    pub async fn save_preferences(&self, preferences: &Preferences) -> AuthResult<()> {
        validation::validate_preferences(preferences)?;
        let body = serde_json::to_value(preferences).map_err(invalid_response)?;
        let response = self
            .session
            .send(ApiRequest::post(PREFERENCES_PATH, Some(body)))
            .await
            .map_err(|e| log_failure("Save preferences", e))?;
        if !response.is_success() {
            return Err(log_failure(
                "Save preferences",
                field_or_server_error(&response, None),
            ));
        }
        Ok(())
    }

    /// Returns the URL to send the browser to for the provider's consent page.
    pub async fn initiate_oauth(&self, provider: OAuthProvider) -> AuthResult<String> {
        let path = match provider {
            OAuthProvider::Microsoft => MICROSOFT_CONNECT_PATH,
            OAuthProvider::Google => {
                return Err(log_failure("OAuth", AuthError::ProviderUnavailable(provider)))
            }
        };
        let response = self
            .session
            .send(ApiRequest::get(path))
            .await
            .map_err(|e| log_failure("OAuth", e))?;
        if !response.is_success() {
            return Err(log_failure("OAuth", server_error(&response)));
        }
        let ConnectResponse { authorization_url } =
            serde_json::from_value(response.body).map_err(invalid_response)?;
        Ok(authorization_url)
    }
}

#[async_trait]
impl UserSource for AccountsClient {
    async fn current_user(&self) -> AuthResult<User> {
        AccountsClient::current_user(self).await
    }
}

//=========================================================================================
// Response Helpers
//=========================================================================================

fn log_failure(operation: &str, err: AuthError) -> AuthError {
    match &err {
        AuthError::Server { status, .. } if *status >= 500 => error!("{} failed: {}", operation, err),
        AuthError::Port(_) => error!("{} failed: {}", operation, err),
        _ => warn!("{} failed: {}", operation, err),
    }
    err
}

fn invalid_response(e: serde_json::Error) -> AuthError {
    AuthError::Server {
        status: 200,
        message: format!("Invalid response from server: {}", e),
    }
}

fn message_or(body: &Value, default: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn server_error(response: &ApiResponse) -> AuthError {
    AuthError::Server {
        status: response.status,
        message: api_message(&response.body)
            .unwrap_or_else(|| format!("request failed with status {}", response.status)),
    }
}

/// Maps an error body to the first field error, then to the API's own
/// message, then to `fallback` (or the status line).
fn field_or_server_error(response: &ApiResponse, fallback: Option<&str>) -> AuthError {
    for (key, field) in FIELD_ERRORS {
        if let Some(message) = first_field_error(&response.body, key) {
            return AuthError::Validation { field, message };
        }
    }
    match (api_message(&response.body), fallback) {
        (Some(message), _) => AuthError::Server {
            status: response.status,
            message,
        },
        (None, Some(fallback)) => AuthError::Server {
            status: response.status,
            message: fallback.to_string(),
        },
        (None, None) => server_error(response),
    }
}
