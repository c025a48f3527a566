//! services/gateway/src/web/pages.rs
//!
//! Minimal HTML shells for the browser-facing pages. The guard middleware has
//! already decided who may see them by the time these run.

use axum::{
    extract::{Extension, Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use meeting_assistant_core::User;
use serde::Deserialize;
use std::sync::Arc;

use crate::web::{cookies::RequestSession, state::AppState};

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub email: Option<String>,
}

fn escape(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            other => other.to_string(),
        })
        .collect()
}

fn shell(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{} | Meeting Assistant</title></head>\
         <body><main id=\"app\" data-page=\"{}\">{}</main></body></html>",
        escape(title),
        escape(&title.to_lowercase()),
        body
    ))
}

pub async fn landing_page() -> Html<String> {
    shell(
        "Meeting Assistant",
        "<h1>Meeting Assistant</h1><a href=\"/auth/register\">Get started</a> <a href=\"/auth/signin\">Sign in</a>",
    )
}

pub async fn sign_in_page() -> Html<String> {
    shell("Sign in", "<h1>Sign in</h1>")
}

pub async fn register_page() -> Html<String> {
    shell("Create account", "<h1>Create your account</h1>")
}

pub async fn verify_page(Query(query): Query<VerifyQuery>) -> Html<String> {
    let sent_to = query
        .email
        .map(|email| format!("<p>We sent a verification link to {}.</p>", escape(&email)))
        .unwrap_or_default();
    shell("Verify email", &format!("<h1>Check your inbox</h1>{}", sent_to))
}

/// Runs the verification when the visitor opens the link from the email.
pub async fn verify_email_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Response {
    let session = RequestSession::from_headers(&headers);
    let body = match state.accounts(&session).verify_email(&token).await {
        Ok(message) => format!(
            "<h1>Email verified</h1><p>{}</p><a href=\"/auth/signin\">Sign in</a>",
            escape(&message)
        ),
        Err(e) => format!(
            "<h1>Verification failed</h1><p>{}</p>\
             <a href=\"/auth/register\">Register with a different email</a> \
             <a href=\"/auth/verify\">Resend verification email</a>",
            escape(&e.display_message())
        ),
    };
    shell("Email verification", &body).into_response()
}

pub async fn onboarding_page(user: Option<Extension<User>>) -> Html<String> {
    let greeting = user
        .map(|Extension(user)| format!("<h1>Welcome, {}</h1>", escape(&user.first_name)))
        .unwrap_or_else(|| "<h1>Welcome</h1>".to_string());
    shell("Onboarding", &greeting)
}

pub async fn dashboard_page(user: Option<Extension<User>>) -> Html<String> {
    let greeting = user
        .map(|Extension(user)| {
            format!(
                "<h1>Hello, {} {}</h1><p>{}</p>",
                escape(&user.first_name),
                escape(&user.last_name),
                escape(&user.email)
            )
        })
        .unwrap_or_else(|| "<h1>Dashboard</h1>".to_string());
    shell("Dashboard", &greeting)
}
