//! Per-client request throttling backed by Redis counters.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// A fixed-window budget for one class of endpoints.
#[derive(Debug, Clone, Copy)]
struct Limit {
    scope: &'static str,
    requests: u64,
    window_seconds: u64,
}

const GENERAL: Limit = Limit {
    scope: "general",
    requests: RATE_LIMIT_REQUESTS,
    window_seconds: RATE_LIMIT_WINDOW_SECONDS,
};

const AUTH: Limit = Limit {
    scope: "auth",
    requests: RATE_LIMIT_AUTH_REQUESTS,
    window_seconds: RATE_LIMIT_AUTH_WINDOW_SECONDS,
};

/// 429 with a `Retry-After` in seconds
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(self.retry_after),
        );
        headers.insert(REMAINING_HEADER, HeaderValue::from(0u64));

        let body = Json(json!({
            "error": {
                "code": "RATE_LIMITED",
                "message": "Too many requests. Please try again later.",
            }
        }));

        (StatusCode::TOO_MANY_REQUESTS, headers, body).into_response()
    }
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the peer address.
fn client_identifier(request: &Request) -> String {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header("X-Forwarded-For").and_then(|v| v.split(',').next()) {
        return ip.trim().to_string();
    }
    if let Some(ip) = header("X-Real-IP") {
        return ip.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(
    state: &AppState,
    limit: Limit,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let Some(cache) = state.cache.as_ref() else {
        return Ok(next.run(request).await);
    };

    let client = client_identifier(&request);
    let status = cache
        .check_rate_limit(limit.scope, &client, limit.requests, limit.window_seconds)
        .await
        .map_err(|e| {
            // Fail closed while Redis is unreachable.
            tracing::error!(scope = limit.scope, error = %e, "Rate limit check failed");
            RateLimitError {
                retry_after: limit.window_seconds,
            }
        })?;

    if !status.allowed() {
        tracing::warn!(
            scope = limit.scope,
            client = %client,
            count = status.count,
            "Rate limit exceeded"
        );
        return Err(RateLimitError {
            retry_after: status.reset_in,
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(status.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(status.remaining()));

    Ok(response)
}

/// General budget applied to every `/api` route.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, GENERAL, request, next).await
}

/// Stricter budget for login and registration.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, AUTH, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_rate_limit_error_response() {
        let response = RateLimitError { retry_after: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "60");
    }

    #[test]
    fn test_client_identifier_prefers_forwarded_for() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "10.0.0.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request), "203.0.113.7");

        let request = Request::builder()
            .header("X-Real-IP", "10.0.0.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request), "10.0.0.9");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_identifier(&request), "unknown");
    }
}
