//! services/gateway/src/web/cookies.rs
//!
//! Per-request session context backed by the browser's cookies.
//!
//! The request's `access_token` and `refresh_token` cookies seed the local
//! token store, its `token` cookie seeds the cookie store. Whatever the core
//! logic changes in those stores is written back as `Set-Cookie` headers.

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{AppendHeaders, IntoResponse, Response},
};
use chrono::Duration;
use meeting_assistant_core::{
    storage::{ACCESS_TOKEN_KEY, COOKIE_TOKEN_KEY, REFRESH_TOKEN_KEY},
    AuthResult, MemoryStore, SessionStorage,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::web::rest::reject;

const LOCAL_KEYS: [&str; 2] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY];

/// How long session cookies live in the browser.
fn cookie_lifetime() -> Duration {
    Duration::days(30)
}

/// RFC 6265 `cookie-octet`: printable ASCII except space, `"`, `,`, `;` and `\`.
fn is_cookie_octet(byte: u8) -> bool {
    matches!(byte, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

/// Parses every `Cookie` header into name/value pairs. Later duplicates win.
/// A value wrapped in double quotes is unwrapped.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// The session tokens of one browser request.
#[derive(Clone)]
pub struct RequestSession {
    local: Arc<MemoryStore>,
    cookies: Arc<MemoryStore>,
    initial: HashMap<String, String>,
    storage: SessionStorage,
}

impl RequestSession {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut jar = parse_cookies(headers);
        let initial: HashMap<String, String> = LOCAL_KEYS
            .iter()
            .chain(std::iter::once(&COOKIE_TOKEN_KEY))
            .filter_map(|key| jar.remove_entry(*key))
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let local = Arc::new(MemoryStore::with_entries(
            initial
                .iter()
                .filter(|(key, _)| LOCAL_KEYS.contains(&key.as_str()))
                .map(|(k, v)| (k.clone(), v.clone())),
        ));
        let cookies = Arc::new(MemoryStore::with_entries(
            initial
                .get(COOKIE_TOKEN_KEY)
                .map(|value| (COOKIE_TOKEN_KEY, value.clone())),
        ));
        let storage = SessionStorage::new(local.clone(), cookies.clone());

        Self {
            local,
            cookies,
            initial,
            storage,
        }
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    fn current(&self) -> HashMap<String, String> {
        let mut current = self.local.snapshot();
        current.extend(self.cookies.snapshot());
        current
    }

    /// `Set-Cookie` values for every token that changed during the request.
    pub fn set_cookie_headers(&self, secure: bool) -> Vec<(HeaderName, String)> {
        let current = self.current();
        LOCAL_KEYS
            .iter()
            .chain(std::iter::once(&COOKIE_TOKEN_KEY))
            .filter_map(|key| {
                let before = self.initial.get(*key);
                let after = current.get(*key);
                if before == after {
                    return None;
                }
                let cookie = match after {
                    Some(value) if !value.bytes().all(is_cookie_octet) => {
                        warn!("Not writing cookie {}: value has characters cookies cannot carry", key);
                        return None;
                    }
                    Some(value) => set_cookie(key, value, cookie_lifetime().num_seconds(), secure),
                    None => set_cookie(key, "", 0, secure),
                };
                Some((header::SET_COOKIE, cookie))
            })
            .collect()
    }

    /// Appends the changed cookies to an already built response.
    pub fn write_cookies(&self, response: &mut Response, secure: bool) {
        for (name, cookie) in self.set_cookie_headers(secure) {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(name, value);
                }
                Err(e) => warn!("Dropping unrepresentable cookie: {}", e),
            }
        }
    }

    /// Turns a handler result into a response carrying the cookie changes,
    /// whether the operation succeeded or not.
    pub fn finish<T: IntoResponse>(&self, secure: bool, result: AuthResult<T>) -> Response {
        let cookies = AppendHeaders(self.set_cookie_headers(secure));
        match result {
            Ok(body) => (cookies, body).into_response(),
            Err(e) => (cookies, reject(e)).into_response(),
        }
    }
}

fn set_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        name,
        value,
        max_age,
        if secure { "; Secure" } else { "" }
    )
}
