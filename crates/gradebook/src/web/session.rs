//! Session cookie plumbing.
//!
//! [`ClientSession`] is an extractor: it reads the session id from the
//! request's cookies, falls back to a fresh id when the cookie is missing or
//! unknown, and remembers whether the client needs to be told the new id.
//! A fresh id is only sent once something was stored under it.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use tracing::warn;

use super::AppState;

/// The session attached to the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    /// Server-side session id.
    pub id: String,
    /// Whether the client does not know this id yet.
    pub is_new: bool,
}

impl ClientSession {
    /// Add a `Set-Cookie` header to `response` when the id is new to the client
    /// and the store now holds a session for it.
    #[must_use]
    pub fn attach(&self, state: &AppState, mut response: Response) -> Response {
        if self.is_new && state.guard.sessions().contains(&self.id) {
            set_session_cookie(response.headers_mut(), &state.cookie_name, &self.id);
        }
        response
    }
}

impl FromRequestParts<AppState> for ClientSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = read_cookie(&parts.headers, &state.cookie_name);
        let (id, is_new) = state.guard.sessions().resolve(presented.as_deref());
        Ok(Self { id, is_new })
    }
}

/// Find the value of cookie `name` in the request's `Cookie` headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Append a `Set-Cookie` header carrying the session id.
pub fn set_session_cookie(headers: &mut HeaderMap, name: &str, id: &str) {
    let cookie = format!("{name}={id}; Path=/; HttpOnly; SameSite=Lax");
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(err) => warn!("Could not encode session cookie: {}", err),
    }
}
