//! crates/meeting_assistant_core/src/error.rs
//!
//! The error taxonomy surfaced by the session manager and the accounts client.
//! Every variant has a display-safe message for the UI.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::domain::OAuthProvider;
use crate::ports::PortError;

/// Generic message shown for server and network failures.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// The form field a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Email,
    Password,
    Name,
    Token,
    Preferences,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::Email => "email",
            FormField::Password => "password",
            FormField::Name => "name",
            FormField::Token => "token",
            FormField::Preferences => "preferences",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Shown inline next to the offending field.
    #[error("Invalid {field}: {message}")]
    Validation { field: FormField, message: String },

    #[error("Email address has not been verified")]
    RequiresVerification { email: Option<String> },

    /// Deliberately does not say which credential was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The refresh token could not be exchanged; the user must sign in again.
    #[error("Session expired")]
    SessionExpired,

    #[error("Sign-in with {0} is not available")]
    ProviderUnavailable(OAuthProvider),

    #[error("Accounts API returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),
}

/// A convenience type alias for `Result<T, AuthError>`.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn validation(field: FormField, message: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            message: message.into(),
        }
    }

    /// The field to highlight, if any.
    pub fn field(&self) -> Option<FormField> {
        match self {
            AuthError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// A message that is safe to render to the user.
    pub fn display_message(&self) -> String {
        match self {
            AuthError::Validation { message, .. } => message.clone(),
            AuthError::RequiresVerification { .. } => {
                "Please verify your email before signing in.".to_string()
            }
            AuthError::InvalidCredentials => "Invalid email or password.".to_string(),
            AuthError::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            AuthError::ProviderUnavailable(provider) => {
                format!("Signing in with {} is not available yet.", provider)
            }
            // 4xx messages come from the API and are meant for users.
            AuthError::Server { status, message } if (400..500).contains(status) => message.clone(),
            AuthError::Server { .. } | AuthError::Port(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Pulls a human-readable message out of an API error body: `error`, then
/// `detail`, then a bare string body.
pub(crate) fn api_message(body: &Value) -> Option<String> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    if let Some(message) = body.get("detail").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    body.as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// First message of a DRF-style `{ "field": ["message", ...] }` entry.
pub(crate) fn first_field_error(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        Value::String(message) => Some(message.clone()),
        _ => None,
    }
}
