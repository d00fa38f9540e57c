use crate::auth::client_ip::extract_client_ip;
use crate::auth::models::AdminSession;
use crate::error::HttpAppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use snaphub_core::AppError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

/// Failed attempts before an IP is blocked
pub const MAX_AUTH_FAILURES: u32 = 10;
/// Block window in seconds
pub const AUTH_FAILURE_WINDOW_SECS: u64 = 900;

/// Counts failed admin logins per client IP inside a fixed window
#[derive(Clone)]
pub struct AuthFailureLimiter {
    inner: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_failures: u32,
    window: Duration,
}

impl AuthFailureLimiter {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_failures,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Record a failure; true once the IP reached the limit
    pub async fn record_failure(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let (count, reset_at) = guard
            .entry(ip.to_string())
            .or_insert((0, now + self.window));
        if now >= *reset_at {
            *count = 0;
            *reset_at = now + self.window;
        }
        *count += 1;
        *count >= self.max_failures
    }

    pub async fn is_blocked(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock().await;
        if let Some((count, reset_at)) = guard.get(ip) {
            if Instant::now() >= *reset_at {
                guard.remove(ip);
                return false;
            }
            return *count >= self.max_failures;
        }
        false
    }

    /// Drop entries whose window has passed
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        self.inner
            .lock()
            .await
            .retain(|_, (_, reset_at)| now < *reset_at);
    }
}

impl Default for AuthFailureLimiter {
    fn default() -> Self {
        Self::new(MAX_AUTH_FAILURES, AUTH_FAILURE_WINDOW_SECS)
    }
}

#[derive(Clone)]
pub struct AdminAuthState {
    pub admin_api_key: String,
    pub limiter: AuthFailureLimiter,
    pub trusted_proxy_count: usize,
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn too_many_attempts() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, "Too many failed auth attempts").into_response()
}

/// Require `Authorization: Bearer <ADMIN_API_KEY>`.
///
/// On success an [`AdminSession`] is added to the request extensions.
pub async fn admin_auth_middleware(
    State(auth_state): State<Arc<AdminAuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        auth_state.trusted_proxy_count,
    );

    if auth_state.limiter.is_blocked(&client_ip).await {
        tracing::warn!(client_ip = %client_ip, "Blocked admin request after repeated failures");
        return too_many_attempts();
    }

    let presented = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let failure = match presented {
        None => Some("Missing or malformed authorization header"),
        Some(key) if !secure_compare(key.trim(), &auth_state.admin_api_key) => {
            Some("Invalid administrator key")
        }
        Some(_) => None,
    };

    if let Some(reason) = failure {
        tracing::warn!(client_ip = %client_ip, reason, "Admin authentication failed");
        if auth_state.limiter.record_failure(&client_ip).await {
            return too_many_attempts();
        }
        return HttpAppError(AppError::Authorization(reason.to_string())).into_response();
    }

    request.extensions_mut().insert(AdminSession { client_ip });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_max_failures() {
        let limiter = AuthFailureLimiter::new(3, 900);
        assert!(!limiter.record_failure("10.0.0.1").await);
        assert!(!limiter.record_failure("10.0.0.1").await);
        assert!(limiter.record_failure("10.0.0.1").await);
        assert!(limiter.is_blocked("10.0.0.1").await);
        assert!(!limiter.is_blocked("10.0.0.2").await);
    }

    #[tokio::test]
    async fn expired_window_unblocks() {
        let limiter = AuthFailureLimiter::new(1, 0);
        assert!(limiter.record_failure("10.0.0.1").await);
        assert!(!limiter.is_blocked("10.0.0.1").await);
        limiter.record_failure("10.0.0.1").await;
        limiter.cleanup_expired().await;
        assert!(!limiter.is_blocked("10.0.0.1").await);
    }

    #[test]
    fn compare_requires_equal_length_and_bytes() {
        assert!(secure_compare("abc", "abc"));
        assert!(!secure_compare("abc", "abd"));
        assert!(!secure_compare("abc", "abcd"));
    }
}
