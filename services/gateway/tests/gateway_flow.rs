//! Integration tests for the gateway.
//!
//! Each test spins up a fake accounts API and the gateway on random ports and
//! drives the gateway over HTTP with reqwest, carrying cookies by hand.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use reqwest::redirect::Policy;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use gateway_lib::{
    adapters::ReqwestTransport,
    config::Config,
    web::{self, AppState},
};

//=========================================================================================
// Fake Accounts API
//=========================================================================================

#[derive(Default)]
struct FakeAccounts {
    onboarded: AtomicBool,
    valid_tokens: Mutex<HashSet<String>>,
    refreshes: AtomicUsize,
    registrations: AtomicUsize,
    verifications: AtomicUsize,
    logouts: AtomicUsize,
}

impl FakeAccounts {
    fn accepts(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| self.valid_tokens.lock().unwrap().contains(token))
    }

    fn user(&self) -> Value {
        json!({
            "id": 7,
            "email": "jane@example.com",
            "username": "jane",
            "first_name": "Jane",
            "last_name": "Doe",
            "has_completed_onboarding": self.onboarded.load(Ordering::SeqCst)
        })
    }
}

type Fake = State<Arc<FakeAccounts>>;

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Given token not valid for any token type" })),
    )
        .into_response()
}

async fn fake_login(State(fake): Fake, Json(body): Json<Value>) -> impl IntoResponse {
    match (body["login"].as_str(), body["password"].as_str()) {
        (Some("jane@example.com"), Some("Secret123!")) => {
            fake.valid_tokens.lock().unwrap().insert("access-1".into());
            (
                StatusCode::OK,
                Json(json!({ "token": "access-1", "refresh": "refresh-1", "user": fake.user() })),
            )
        }
        (Some("new@example.com"), _) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Please verify your email address before signing in.",
                "email": "new@example.com",
                "requires_verification": true
            })),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid password" }))),
    }
}

async fn fake_refresh(State(fake): Fake, Json(body): Json<Value>) -> impl IntoResponse {
    if body["refresh"] != "refresh-1" {
        return unauthorized();
    }
    fake.refreshes.fetch_add(1, Ordering::SeqCst);
    fake.valid_tokens.lock().unwrap().insert("access-2".into());
    Json(json!({ "access": "access-2" })).into_response()
}

async fn fake_me(State(fake): Fake, headers: HeaderMap) -> impl IntoResponse {
    if !fake.accepts(&headers) {
        return unauthorized();
    }
    Json(fake.user()).into_response()
}

async fn fake_complete(State(fake): Fake, headers: HeaderMap) -> impl IntoResponse {
    if !fake.accepts(&headers) {
        return unauthorized();
    }
    fake.onboarded.store(true, Ordering::SeqCst);
    Json(json!({ "status": "onboarding completed" })).into_response()
}

async fn fake_logout(State(fake): Fake) -> impl IntoResponse {
    fake.logouts.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "message": "Successfully logged out" }))
}

async fn fake_register(State(fake): Fake, Json(body): Json<Value>) -> impl IntoResponse {
    fake.registrations.fetch_add(1, Ordering::SeqCst);
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "email": ["user with this email already exists."] })),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Please check your email to verify your account.",
            "email": body["email"]
        })),
    )
}

async fn fake_verify(State(fake): Fake, Path(_token): Path<String>) -> impl IntoResponse {
    fake.verifications.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "message": "Email successfully verified" }))
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", address)
}

/// Starts the fake accounts API and a gateway pointed at it.
async fn start() -> (String, Arc<FakeAccounts>) {
    let fake = Arc::new(FakeAccounts::default());
    let accounts = Router::new()
        .route("/api/accounts/login/", post(fake_login))
        .route("/api/accounts/token/refresh/", post(fake_refresh))
        .route("/api/accounts/me/", get(fake_me))
        .route("/api/accounts/complete-onboarding/", post(fake_complete))
        .route("/api/accounts/logout/", post(fake_logout))
        .route("/api/accounts/register/", post(fake_register))
        .route("/api/accounts/verify-email/{token}", get(fake_verify))
        .with_state(fake.clone());
    let accounts_url = serve(accounts).await;

    let config = Arc::new(Config {
        accounts_api_url: accounts_url.clone(),
        guard_timeout: Duration::from_secs(2),
        ..Config::default()
    });
    let transport = Arc::new(ReqwestTransport::new(accounts_url, Duration::from_secs(2)).unwrap());
    let gateway = serve(web::router(Arc::new(AppState::new(config, transport)))).await;

    // Give the servers a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (gateway, fake)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn location(response: &reqwest::Response) -> String {
    response.headers()[header::LOCATION].to_str().unwrap().to_string()
}

const SIGNED_IN: &str = "access_token=access-1; refresh_token=refresh-1; token=access-1";

//=========================================================================================
// Route Guard
//=========================================================================================

#[tokio::test]
async fn protected_page_without_session_redirects_to_sign_in() {
    let (gateway, _) = start().await;

    let response = client()
        .get(format!("{}/dashboard/calendar", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin?next=%2Fdashboard%2Fcalendar");
}

#[tokio::test]
async fn sign_in_then_onboard_then_reach_dashboard() {
    let (gateway, fake) = start().await;
    let http = client();

    let login = http
        .post(format!("{}/api/auth/login", gateway))
        .json(&json!({ "email": "jane@example.com", "password": "Secret123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let cookies = set_cookies(&login);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=access-1;")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=refresh-1;")));
    assert!(cookies.iter().any(|c| c.starts_with("token=access-1;")));
    let body: Value = login.json().await.unwrap();
    assert_eq!(body["redirect_to"], "/onboarding");

    let dashboard = http
        .get(format!("{}/dashboard", gateway))
        .header(header::COOKIE, SIGNED_IN)
        .send()
        .await
        .unwrap();
    assert_eq!(dashboard.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&dashboard), "/onboarding");

    let onboarding = http
        .get(format!("{}/onboarding", gateway))
        .header(header::COOKIE, SIGNED_IN)
        .send()
        .await
        .unwrap();
    assert_eq!(onboarding.status(), StatusCode::OK);

    let complete = http
        .post(format!("{}/api/onboarding/complete", gateway))
        .header(header::COOKIE, SIGNED_IN)
        .send()
        .await
        .unwrap();
    assert_eq!(complete.status(), StatusCode::OK);
    let body: Value = complete.json().await.unwrap();
    assert_eq!(body["user"]["has_completed_onboarding"], true);
    assert!(fake.onboarded.load(Ordering::SeqCst));

    let dashboard = http
        .get(format!("{}/dashboard", gateway))
        .header(header::COOKIE, SIGNED_IN)
        .send()
        .await
        .unwrap();
    assert_eq!(dashboard.status(), StatusCode::OK);
    assert!(dashboard.text().await.unwrap().contains("Hello, Jane Doe"));

    let back_to_onboarding = http
        .get(format!("{}/onboarding", gateway))
        .header(header::COOKIE, SIGNED_IN)
        .send()
        .await
        .unwrap();
    assert_eq!(location(&back_to_onboarding), "/dashboard");
}

#[tokio::test]
async fn guard_refreshes_expired_access_token() {
    let (gateway, fake) = start().await;
    // access-1 is not accepted: it has expired.

    let response = client()
        .get(format!("{}/onboarding", gateway))
        .header(header::COOKIE, SIGNED_IN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fake.refreshes.load(Ordering::SeqCst), 1);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=access-2;")));
    assert!(cookies.iter().any(|c| c.starts_with("token=access-2;")));
}

#[tokio::test]
async fn unusable_refresh_token_signs_out() {
    let (gateway, _) = start().await;

    let response = client()
        .get(format!("{}/dashboard", gateway))
        .header(header::COOKIE, "access_token=x; refresh_token=revoked; token=x")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin?next=%2Fdashboard");
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 3);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn corrupt_session_is_cleared() {
    let (gateway, _) = start().await;

    let response = client()
        .get(format!("{}/dashboard", gateway))
        .header(header::COOKIE, "token=orphan")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookies(&response)
        .iter()
        .any(|c| c.starts_with("token=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn signed_in_visitor_is_sent_past_sign_in() {
    let (gateway, _) = start().await;

    let response = client()
        .get(format!("{}/auth/signin", gateway))
        .header(header::COOKIE, SIGNED_IN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
}

//=========================================================================================
// Auth API
//=========================================================================================

#[tokio::test]
async fn wrong_password_is_generic_401() {
    let (gateway, fake) = start().await;

    let response = client()
        .post(format!("{}/api/auth/login", gateway))
        .json(&json!({ "email": "jane@example.com", "password": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid email or password.");
    assert_eq!(fake.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unverified_login_asks_for_verification() {
    let (gateway, _) = start().await;

    let response = client()
        .post(format!("{}/api/auth/login", gateway))
        .json(&json!({ "email": "new@example.com", "password": "Secret123!" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["requires_verification"], true);
    assert_eq!(body["email"], "new@example.com");
}

#[tokio::test]
async fn login_honours_local_next_only() {
    let (gateway, _) = start().await;
    let http = client();

    for (next, expected) in [
        ("/dashboard/calendar", "/dashboard/calendar"),
        ("https://evil.example/", "/onboarding"),
    ] {
        let response = http
            .post(format!("{}/api/auth/login", gateway))
            .json(&json!({ "email": "jane@example.com", "password": "Secret123!", "next": next }))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["redirect_to"], expected);
    }
}

#[tokio::test]
async fn logout_expires_cookies_and_is_idempotent() {
    let (gateway, fake) = start().await;
    let http = client();

    let first = http
        .post(format!("{}/api/auth/logout", gateway))
        .header(header::COOKIE, SIGNED_IN)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let cookies = set_cookies(&first);
    assert_eq!(cookies.len(), 3);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(fake.logouts.load(Ordering::SeqCst), 1);

    let again = http
        .post(format!("{}/api/auth/logout", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    assert!(set_cookies(&again).is_empty());
    assert_eq!(fake.logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn short_password_registration_never_reaches_api() {
    let (gateway, fake) = start().await;

    let response = client()
        .post(format!("{}/api/auth/register", gateway))
        .json(&json!({ "email": "a@b.com", "password": "pw", "name": "John Doe" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["field"], "password");
    assert_eq!(fake.registrations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn registration_points_to_verification_page() {
    let (gateway, _) = start().await;

    let response = client()
        .post(format!("{}/api/auth/register", gateway))
        .json(&json!({ "email": "a+b@c.com", "password": "longenough", "name": "Ann" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["redirect_to"], "/auth/verify?email=a%2Bb%40c.com");
}

#[tokio::test]
async fn taken_email_is_reported_on_email_field() {
    let (gateway, _) = start().await;

    let response = client()
        .post(format!("{}/api/auth/register", gateway))
        .json(&json!({ "email": "taken@example.com", "password": "longenough", "name": "Ann Lee" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["field"], "email");
    assert_eq!(body["error"], "user with this email already exists.");
}

#[tokio::test]
async fn verification_link_with_wrong_length_is_rejected_locally() {
    let (gateway, fake) = start().await;

    let page = client()
        .get(format!("{}/auth/verify-email/abc123", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    assert!(page.text().await.unwrap().contains("Invalid verification token format"));

    let api = client()
        .get(format!("{}/api/auth/verify-email/abc123", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fake.verifications.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn encoded_slashes_in_verification_link_never_reach_api() {
    let (gateway, fake) = start().await;

    let response = client()
        .get(format!(
            "{}/api/auth/verify-email/..%2Fme%2F{}",
            gateway,
            "a".repeat(58)
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["field"], "token");
    assert_eq!(fake.verifications.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn well_formed_verification_link_reaches_api() {
    let (gateway, fake) = start().await;

    let response = client()
        .get(format!("{}/api/auth/verify-email/{}", gateway, "c".repeat(64)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["redirect_to"], "/auth/signin");
    assert_eq!(fake.verifications.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn me_with_dead_session_points_to_sign_in() {
    let (gateway, _) = start().await;

    let response = client()
        .get(format!("{}/api/auth/me", gateway))
        .header(header::COOKIE, "access_token=x; refresh_token=revoked; token=x")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["redirect_to"], "/auth/signin");
}

#[tokio::test]
async fn password_strength_is_scored() {
    let (gateway, _) = start().await;

    let response = client()
        .post(format!("{}/api/auth/password-strength", gateway))
        .json(&json!({ "password": "Secret123!" }))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["score"], 5);
    assert_eq!(body["label"], "Very strong");
}
