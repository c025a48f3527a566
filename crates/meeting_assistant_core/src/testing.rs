//! Test doubles shared by the core unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::ports::{ApiRequest, ApiResponse, HttpTransport, Method, PortResult};
use crate::storage::SessionStorage;

type Handler = dyn Fn(&ApiRequest) -> PortResult<ApiResponse> + Send + Sync;

/// An `HttpTransport` answering from a closure and recording every request.
/// Yields once per call so concurrent callers interleave.
pub struct FakeTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> PortResult<ApiResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: &ApiRequest) -> PortResult<ApiResponse> {
        tokio::task::yield_now().await;
        self.calls.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub fn ok(body: Value) -> PortResult<ApiResponse> {
    Ok(ApiResponse::new(200, body))
}

pub fn status(code: u16, body: Value) -> PortResult<ApiResponse> {
    Ok(ApiResponse::new(code, body))
}

pub fn bearer(request: &ApiRequest) -> Option<&str> {
    request
        .header("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
}

pub fn is(request: &ApiRequest, method: Method, path: &str) -> bool {
    request.method == method && request.path == path
}

pub fn user_json(onboarded: bool) -> Value {
    json!({
        "id": 42,
        "email": "jane@example.com",
        "username": "jane",
        "first_name": "Jane",
        "last_name": "Doe",
        "has_completed_onboarding": onboarded
    })
}

pub fn signed_in_storage(access: &str, refresh: &str) -> SessionStorage {
    let storage = SessionStorage::in_memory();
    storage
        .persist(&crate::domain::Session {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        })
        .unwrap();
    storage
}
