//! crates/meeting_assistant_core/src/validation.rs
//!
//! Local input checks run before any call to the accounts API.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::{Preferences, Registration};
use crate::error::{AuthError, AuthResult, FormField};
use crate::password::MIN_PASSWORD_LENGTH;

pub const VERIFICATION_TOKEN_LENGTH: usize = 64;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

static TOKEN_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("token pattern is valid"));

/// Splits a free-text name: the first word is the first name, the rest joined
/// by single spaces is the last name, which falls back to the first name.
/// Returns `None` for a blank name.
pub fn split_full_name(name: &str) -> Option<(String, String)> {
    let mut words = name.split_whitespace();
    let first = words.next()?.to_string();
    let rest = words.collect::<Vec<_>>().join(" ");
    let last = if rest.is_empty() { first.clone() } else { rest };
    Some((first, last))
}

pub fn validate_email(email: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::validation(FormField::Email, "Email is required"));
    }
    if !EMAIL_SHAPE.is_match(email) {
        return Err(AuthError::validation(
            FormField::Email,
            "Please enter a valid email address",
        ));
    }
    Ok(())
}

/// Checks the sign-up form and builds the register payload.
pub fn registration(email: &str, password: &str, name: &str) -> AuthResult<Registration> {
    validate_email(email)?;

    if password.is_empty() {
        return Err(AuthError::validation(FormField::Password, "Password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::validation(
            FormField::Password,
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }

    let (first_name, last_name) = split_full_name(name)
        .ok_or_else(|| AuthError::validation(FormField::Name, "Name is required"))?;

    Ok(Registration {
        email: email.trim().to_string(),
        password: password.to_string(),
        first_name,
        last_name,
    })
}

pub fn validate_preferences(preferences: &Preferences) -> AuthResult<()> {
    if preferences.working_hours.start >= preferences.working_hours.end {
        return Err(AuthError::validation(
            FormField::Preferences,
            "Working hours must end after they start",
        ));
    }
    if preferences.work_days.is_empty() {
        return Err(AuthError::validation(
            FormField::Preferences,
            "Select at least one work day",
        ));
    }
    if preferences.preferred_meeting_duration == 0 {
        return Err(AuthError::validation(
            FormField::Preferences,
            "Meeting duration must be greater than zero",
        ));
    }
    Ok(())
}

/// An email verification token in the exact shape the accounts API issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken(String);

impl VerificationToken {
    /// Accepts the token segment of a verification link, already
    /// percent-decoded by the router. A trailing slash is stripped; the rest
    /// must be exactly 64 URL-safe characters so it can be placed in the
    /// accounts API path as-is.
    pub fn parse(raw: &str) -> AuthResult<Self> {
        let token = raw.trim().trim_end_matches('/');

        if token.is_empty() {
            return Err(AuthError::validation(
                FormField::Token,
                "No verification token provided",
            ));
        }
        let length = token.chars().count();
        if length != VERIFICATION_TOKEN_LENGTH {
            return Err(AuthError::validation(
                FormField::Token,
                format!(
                    "Invalid verification token format (length: {}, expected: {})",
                    length, VERIFICATION_TOKEN_LENGTH
                ),
            ));
        }
        if !TOKEN_SHAPE.is_match(token) {
            return Err(AuthError::validation(
                FormField::Token,
                "Invalid verification token format (unexpected characters)",
            ));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
