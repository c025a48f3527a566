//! services/gateway/src/adapters/http.rs
//!
//! This module contains the adapter for the external accounts REST API.
//! It implements the `HttpTransport` port from the `core` crate using reqwest.

use async_trait::async_trait;
use meeting_assistant_core::ports::{
    ApiRequest, ApiResponse, HttpTransport, Method, PortError, PortResult,
};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `HttpTransport` port against a base URL.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransport` whose requests time out after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

//=========================================================================================
// `HttpTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> PortResult<ApiResponse> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            Some(body) => builder.json(body),
            // DRF still expects a JSON content type on empty POSTs.
            None if request.method == Method::Post => builder.json(&Value::Object(Default::default())),
            None => builder,
        };

        // Map the error manually, which respects the orphan rule.
        let response = builder
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        debug!("{:?} {} -> {}", request.method, request.path, status);

        Ok(ApiResponse::new(status, decode_body(&text)))
    }
}

/// JSON bodies are parsed; anything else is kept as a string, empty as null.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
