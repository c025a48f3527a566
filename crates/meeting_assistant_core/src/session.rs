//! crates/meeting_assistant_core/src/session.rs
//!
//! The session manager: attaches bearer credentials to outgoing requests and
//! transparently refreshes an expired access token, retrying the original
//! request at most once.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::ports::{ApiRequest, ApiResponse, HttpTransport, PortResult};
use crate::storage::SessionStorage;

pub const TOKEN_REFRESH_PATH: &str = "/api/accounts/token/refresh/";

/// A request travelling through the retry pipeline. `retried` is set once the
/// request has been resubmitted after a refresh and never reset.
#[derive(Debug, Clone)]
pub struct RetryableRequest {
    pub request: ApiRequest,
    pub retried: bool,
}

impl RetryableRequest {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Owns the credentials of one session context and every authenticated
/// round trip made on its behalf.
#[derive(Clone)]
pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    storage: SessionStorage,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn HttpTransport>, storage: SessionStorage) -> Self {
        Self { transport, storage }
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Adds `Authorization: Bearer <access token>` when one is stored;
    /// otherwise returns the request unchanged.
    pub fn attach_credentials(&self, request: ApiRequest) -> PortResult<ApiRequest> {
        match self.storage.access_token()? {
            Some(token) => Ok(request.with_bearer(&token)),
            None => Ok(request),
        }
    }

    /// Sends an authenticated request. A 401 triggers one refresh and one
    /// retry; transport failures are returned unchanged.
    pub async fn send(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        let pending = RetryableRequest::new(self.attach_credentials(request)?);
        let response = self.transport.send(&pending.request).await?;

        if response.is_unauthorized() && !pending.retried {
            return self.handle_unauthorized(pending, response).await;
        }
        Ok(response)
    }

    /// Sends a request without credentials and without refresh handling.
    pub async fn send_anonymous(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        Ok(self.transport.send(&request).await?)
    }

    /// Exchanges the refresh token and resubmits `pending` exactly once.
    ///
    /// If `pending` was already retried the response is passed back untouched,
    /// so a second 401 can never start another refresh. When the refresh
    /// fails for any reason the session is cleared and `SessionExpired` is
    /// returned; callers route the user to sign-in.
    pub async fn handle_unauthorized(
        &self,
        mut pending: RetryableRequest,
        response: ApiResponse,
    ) -> AuthResult<ApiResponse> {
        if pending.retried {
            return Ok(response);
        }
        pending.retried = true;

        let access = match self.refresh_access_token().await {
            Ok(access) => access,
            Err(e) => {
                warn!("Token refresh failed, ending session: {}", e);
                if let Err(clear_err) = self.storage.clear() {
                    warn!("Failed to clear session after refresh failure: {}", clear_err);
                }
                return Err(AuthError::SessionExpired);
            }
        };

        pending.request = pending.request.with_bearer(&access);
        debug!("Retrying {} with refreshed credentials", pending.request.path);
        Ok(self.transport.send(&pending.request).await?)
    }

    async fn refresh_access_token(&self) -> AuthResult<String> {
        let refresh = self
            .storage
            .refresh_token()?
            .ok_or(AuthError::SessionExpired)?;

        let response = self
            .send_anonymous(ApiRequest::post(
                TOKEN_REFRESH_PATH,
                Some(json!({ "refresh": refresh })),
            ))
            .await?;

        if !response.is_success() {
            return Err(AuthError::Server {
                status: response.status,
                message: "token refresh rejected".to_string(),
            });
        }

        let RefreshResponse { access } =
            serde_json::from_value(response.body).map_err(|e| AuthError::Server {
                status: 200,
                message: format!("malformed refresh response: {}", e),
            })?;

        self.storage.update_access_token(&access)?;
        info!("Access token refreshed");
        Ok(access)
    }
}
