//! Fixed-window request limiting per client IP.
//!
//! Every route group is wrapped with a [`RateTier`]; a client gets `limit`
//! requests per tier per minute. Windows are tracked in process memory, so
//! each server instance limits independently.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;
use tracing::warn;

use crate::errors::AppError;

const WINDOW: Duration = Duration::from_secs(60);
/// Windows are swept once the map grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateTier {
    /// Lightweight lookups: 300/min.
    Generous,
    /// Content reads: 100/min.
    Api,
    /// Expensive work (PDF rendering, AI drafting): 10/min.
    Strict,
}

impl RateTier {
    pub fn limit(self) -> u32 {
        match self {
            RateTier::Generous => 300,
            RateTier::Api => 100,
            RateTier::Strict => 10,
        }
    }
}

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<(RateTier, String), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request. Returns `Err(retry_after_secs)` once the client
    /// has exhausted the tier's allowance for the current window.
    pub fn check(&self, tier: RateTier, client: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < WINDOW);
        }

        let window = windows
            .entry((tier, client.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.duration_since(window.started) >= WINDOW {
            window.started = now;
            window.count = 0;
        }

        if window.count >= tier.limit() {
            let elapsed = now.duration_since(window.started);
            let remaining = WINDOW.saturating_sub(elapsed).as_secs().max(1);
            return Err(remaining);
        }

        window.count += 1;
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// State handed to [`enforce`] for one route group.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub tier: RateTier,
    pub trusted_proxy_hops: usize,
}

/// Axum middleware rejecting requests over the tier's allowance with 429.
pub async fn enforce(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_ip(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        state.trusted_proxy_hops,
    )
    .unwrap_or_else(|| "unknown".to_string());

    if let Err(retry_after_secs) = state.limiter.check(state.tier, &client) {
        warn!(
            "Rate limit exceeded for {client} on {} ({:?})",
            request.uri().path(),
            state.tier
        );
        return Err(AppError::RateLimited { retry_after_secs });
    }

    Ok(next.run(request).await)
}

/// Client address used for limiting and analytics.
///
/// With no trusted proxies this is always the TCP peer, since any client can
/// write `X-Forwarded-For`. Behind `trusted_proxy_hops` proxies, each one
/// appends the address it saw, so the client is the entry `hops` places from
/// the right; entries left of it are client-supplied and ignored.
pub fn client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trusted_proxy_hops: usize,
) -> Option<String> {
    let peer = || connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());
    if trusted_proxy_hops == 0 {
        return peer();
    }

    let hops: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    hops.len()
        .checked_sub(trusted_proxy_hops)
        .and_then(|i| hops.get(i))
        .map(|v| v.to_string())
        .or_else(peer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_strict_tier_blocks_eleventh_request() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            assert!(limiter.check(RateTier::Strict, "1.2.3.4").is_ok());
        }
        let retry = limiter.check(RateTier::Strict, "1.2.3.4").unwrap_err();
        assert_eq!(retry, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_a_minute() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            limiter.check(RateTier::Strict, "c").unwrap();
        }
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(limiter.check(RateTier::Strict, "c").unwrap_err(), 15);

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(limiter.check(RateTier::Strict, "c").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiers_and_clients_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            limiter.check(RateTier::Strict, "a").unwrap();
        }
        assert!(limiter.check(RateTier::Strict, "a").is_err());
        assert!(limiter.check(RateTier::Strict, "b").is_ok());
        assert!(limiter.check(RateTier::Api, "a").is_ok());
    }

    fn peer(addr: &str) -> ConnectInfo<SocketAddr> {
        ConnectInfo(addr.parse::<SocketAddr>().unwrap())
    }

    #[test]
    fn test_client_ip_ignores_forwarded_for_without_trusted_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
        let peer = peer("192.0.2.10:9000");
        assert_eq!(
            client_ip(&headers, Some(&peer), 0).as_deref(),
            Some("192.0.2.10")
        );
    }

    #[test]
    fn test_client_ip_takes_hop_appended_by_trusted_proxy() {
        let mut headers = HeaderMap::new();
        // Client forged the first entry; the proxy appended the real address.
        headers.insert("x-forwarded-for", "10.9.9.9, 203.0.113.7".parse().unwrap());
        let proxy = peer("127.0.0.1:9000");
        assert_eq!(
            client_ip(&headers, Some(&proxy), 1).as_deref(),
            Some("203.0.113.7")
        );
        assert_eq!(
            client_ip(&headers, Some(&proxy), 2).as_deref(),
            Some("10.9.9.9")
        );
    }

    #[test]
    fn test_client_ip_short_chain_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
        let proxy = peer("127.0.0.1:9000");
        assert_eq!(
            client_ip(&headers, Some(&proxy), 2).as_deref(),
            Some("127.0.0.1")
        );
        assert_eq!(client_ip(&HeaderMap::new(), None, 0), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotating_forwarded_for_does_not_evade_limit() {
        let limiter = RateLimiter::new();
        let peer = peer("203.0.113.9:5000");
        let mut rejected = 0;
        for i in 0..50 {
            let mut headers = HeaderMap::new();
            headers.insert("x-forwarded-for", format!("10.0.0.{i}").parse().unwrap());
            let client = client_ip(&headers, Some(&peer), 0).unwrap();
            if limiter.check(RateTier::Strict, &client).is_err() {
                rejected += 1;
            }
        }
        assert_eq!(rejected, 40);
    }
}
