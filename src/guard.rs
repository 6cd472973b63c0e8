//! Route guard: stateless session check in front of the protected paths.
//!
//! The guard trusts the token signature alone and never touches the data
//! service, so a revoked allow-list entry keeps working until its session
//! expires.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use cookie::time::Duration;
use cookie::{Cookie, CookieBuilder, SameSite};
use std::sync::Arc;

use crate::auth::{SessionKeys, SESSION_COOKIE};
use crate::models::SessionClaims;

pub const ENTRY_PATH: &str = "/";

/// Path prefixes that require a session. A prefix covers itself and its sub-paths.
#[derive(Debug, Clone, Default)]
pub struct ProtectedPaths {
    prefixes: Vec<String>,
}

impl ProtectedPaths {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|p| p.as_ref().trim().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    keys: SessionKeys,
    protected: Arc<ProtectedPaths>,
}

impl RouteGuard {
    pub fn new(keys: SessionKeys, protected: ProtectedPaths) -> Self {
        Self {
            keys,
            protected: Arc::new(protected),
        }
    }
}

pub async fn route_guard(
    State(guard): State<RouteGuard>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    if !guard.protected.matches(&path) {
        return next.run(req).await;
    }

    match session_from_headers(req.headers(), &guard.keys) {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => {
            tracing::debug!(path = %path, "no valid session; redirecting to entry page");
            Redirect::to(ENTRY_PATH).into_response()
        }
    }
}

/// Verified session from the session cookie or a bearer header, if any.
pub fn session_from_headers(headers: &HeaderMap, keys: &SessionKeys) -> Option<SessionClaims> {
    let token = read_cookie(headers, SESSION_COOKIE).or_else(|| bearer_token(headers))?;
    match keys.validate(&token) {
        Ok(claims) => Some(claims),
        Err(err) => {
            tracing::debug!(error = %err, "session token rejected");
            None
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value_trimmed().to_string())
}

/// `Set-Cookie` value for an HTTP-only, lax, root-scoped cookie.
pub fn set_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> HeaderValue {
    let max_age = Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX));
    header_value(base_cookie(name, value.to_string()).secure(secure).max_age(max_age).build())
        .unwrap_or_else(|| clear_cookie(name))
}

pub fn clear_cookie(name: &str) -> HeaderValue {
    header_value(base_cookie(name, String::new()).max_age(Duration::ZERO).build())
        .unwrap_or_else(|| HeaderValue::from_static("invalid=; Max-Age=0"))
}

fn base_cookie(name: &str, value: String) -> CookieBuilder<'static> {
    Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
}

fn header_value(cookie: Cookie<'_>) -> Option<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string()).ok()
}
