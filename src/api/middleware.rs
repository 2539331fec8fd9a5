//! Request middleware for the skill swap API
//!
//! Provides:
//! - Actor identity extraction from the upstream identity layer
//! - Optional API key gate
//! - Rate limiting per IP
//! - Body size limit and security headers
//! - Request logging with sanitization

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::config::SwapConfig;
use crate::models::UserId;

/// Header carrying the authenticated user id
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Security configuration for middleware
#[derive(Debug, Clone)]
pub struct SecurityMiddlewareConfig {
    /// Enable API key authentication
    pub enable_auth: bool,
    pub api_keys: Vec<String>,
    /// Rate limit: requests per minute per IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
    pub log_requests: bool,
    /// Paths that don't require an API key
    pub public_paths: Vec<String>,
}

impl Default for SecurityMiddlewareConfig {
    fn default() -> Self {
        Self {
            enable_auth: false,
            api_keys: Vec::new(),
            rate_limit_per_minute: 120,
            max_request_size: 64 * 1024,
            log_requests: false,
            public_paths: vec!["/health".to_string()],
        }
    }
}

impl From<&SwapConfig> for SecurityMiddlewareConfig {
    fn from(config: &SwapConfig) -> Self {
        Self {
            enable_auth: config.security.enable_auth,
            api_keys: config.security.api_keys.clone(),
            rate_limit_per_minute: config.security.rate_limit_per_minute,
            max_request_size: config.security.max_request_size,
            log_requests: config.logging.log_requests,
            ..Self::default()
        }
    }
}

/// Fixed-window request counter keyed by client IP
#[derive(Debug)]
pub struct RateLimiter {
    /// IP -> (request count, window start)
    requests: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests: DashMap::new(),
            limit: requests_per_minute,
            window: Duration::from_secs(60),
        }
    }

    /// Count a request. Returns (allowed, remaining, reset_after_secs).
    pub fn check_request(&self, ip: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(ip.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) >= self.window {
            *count = 0;
            *window_start = now;
        }

        let reset_after = self
            .window
            .checked_sub(now.duration_since(*window_start))
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if *count >= self.limit {
            return (false, 0, reset_after);
        }

        *count += 1;
        (true, self.limit - *count, reset_after)
    }

    /// Drop windows that expired long ago
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.requests
            .retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

/// Shared state for security middleware
#[derive(Clone)]
pub struct SecurityState {
    pub config: SecurityMiddlewareConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SecurityState {
    pub fn new(config: SecurityMiddlewareConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self {
            config,
            rate_limiter,
        }
    }
}

/// The user on whose behalf a request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::MissingActor)?;

        Uuid::parse_str(raw.trim())
            .map(Actor)
            .map_err(|_| ApiError::MissingActor)
    }
}

/// Client IP, preferring proxy headers over the socket address
fn get_client_ip(headers: &HeaderMap, addr: Option<&SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            // First hop is the original client
            if let Some(ip) = value.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip) = real_ip.to_str() {
            return ip.trim().to_string();
        }
    }

    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn connect_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Mask the middle of a value for logging
pub fn sanitize_for_log(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn is_public_path(path: &str, public_paths: &[String]) -> bool {
    public_paths.iter().any(|p| path.starts_with(p))
}

/// API key gate, active only when auth is enabled
pub async fn auth_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = request.uri().path();

    if !state.config.enable_auth || is_public_path(path, &state.config.public_paths) {
        return Ok(next.run(request).await);
    }

    let api_key = headers
        .get("x-api-key")
        .or_else(|| headers.get("authorization"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim_start_matches("Bearer ").to_string());

    match api_key {
        Some(key) if state.config.api_keys.contains(&key) => {
            debug!(path = %path, "API key authenticated");
            Ok(next.run(request).await)
        }
        Some(key) => {
            warn!(path = %path, key = %sanitize_for_log(&key), "Invalid API key");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            warn!(path = %path, "Missing API key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let client_ip = get_client_ip(&headers, connect_addr(&request).as_ref());
    let (allowed, remaining, reset_after) = state.rate_limiter.check_request(&client_ip);
    let limit = state.config.rate_limit_per_minute;

    if !allowed {
        warn!(
            client_ip = %sanitize_for_log(&client_ip),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );

        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
        headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));
        headers.insert("Retry-After", HeaderValue::from(reset_after));
        return Err(response);
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));

    Ok(response)
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Profiles and balances must not be cached by intermediaries
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.remove("Server");

    response
}

/// Request logging with the client IP masked
pub async fn logging_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.log_requests {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = sanitize_for_log(&get_client_ip(&headers, connect_addr(&request).as_ref()));

    let response = next.run(request).await;
    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        error!(method = %method, path = %path, status, duration_ms, client_ip = %client_ip, "Request failed");
    } else if response.status().is_client_error() {
        warn!(method = %method, path = %path, status, duration_ms, client_ip = %client_ip, "Client error");
    } else {
        info!(method = %method, path = %path, status, duration_ms, client_ip = %client_ip, "Request completed");
    }

    response
}

/// Reject bodies whose declared length exceeds the limit
pub async fn body_size_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let declared = headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared {
        if length > state.config.max_request_size {
            warn!(
                length,
                max = state.config.max_request_size,
                "Request body too large"
            );
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
    }

    Ok(next.run(request).await)
}
