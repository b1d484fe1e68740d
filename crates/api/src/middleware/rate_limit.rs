//! Per-terminal rate limiting for coupon routes.
//!
//! Slows down brute-force guessing of coupon codes. Terminals listed in
//! `security.terminal_ids` get their own bucket via `X-Terminal-ID`. Every
//! other request is counted against its peer address, or against one shared
//! anonymous bucket when the connection address is unknown. An unlisted
//! `X-Terminal-ID` is ignored, so rotating the header buys nothing.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter as GovRateLimiter,
};
use std::{collections::HashSet, net::SocketAddr, num::NonZeroU32};

use crate::app::AppState;
use crate::error::ApiError;

pub const TERMINAL_ID_HEADER: &str = "x-terminal-id";
const ANONYMOUS_KEY: &str = "anonymous";

/// Idle keys are pruned once this many are tracked.
pub const MAX_TRACKED_KEYS: usize = 10_000;

/// Keyed rate limiter shared across requests.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<String>,
    terminal_ids: HashSet<String>,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// `rate_limit_per_minute` of 0 is treated as 1; callers disable limiting
    /// by not creating a state at all.
    pub fn new(rate_limit_per_minute: u32, terminal_ids: &[String]) -> Self {
        let per_minute = NonZeroU32::new(rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: GovRateLimiter::keyed(Quota::per_minute(per_minute)),
            terminal_ids: terminal_ids
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            rate_limit_per_minute,
        }
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Returns `Err(retry_after_secs)` when the key is over its quota.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        let result = self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1)
        });

        if self.limiter.len() > MAX_TRACKED_KEYS {
            self.limiter.retain_recent();
            self.limiter.shrink_to_fit();
        }

        result
    }

    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    /// Picks the bucket a request is counted against.
    pub fn key_for(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        let terminal = headers
            .get(TERMINAL_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| self.terminal_ids.contains(*id));

        if let Some(terminal) = terminal {
            return format!("terminal:{}", terminal);
        }

        match peer {
            Some(addr) => format!("ip:{}", addr.ip()),
            None => ANONYMOUS_KEY.to_string(),
        }
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("terminal_ids", &self.terminal_ids.len())
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(ref limiter) = state.rate_limiter {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let key = limiter.key_for(req.headers(), peer);
        if let Err(retry_after_secs) = limiter.check(&key) {
            tracing::warn!(
                bucket = %key,
                limit_per_minute = limiter.rate_limit_per_minute(),
                "Coupon route rate limit exceeded"
            );
            return ApiError::RateLimited { retry_after_secs }.into_response();
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn terminals() -> Vec<String> {
        vec!["food-stall-3".to_string(), "drinks-1".to_string()]
    }

    fn terminal_header(id: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(TERMINAL_ID_HEADER, HeaderValue::from_str(id).unwrap());
        map
    }

    fn peer(ip: &str) -> Option<SocketAddr> {
        Some(SocketAddr::new(ip.parse().unwrap(), 40000))
    }

    #[test]
    fn test_rate_limiter_allows_first_request() {
        let state = RateLimiterState::new(10, &[]);
        assert!(state.check("terminal:a").is_ok());
    }

    #[test]
    fn test_rate_limiter_exhaustion() {
        let state = RateLimiterState::new(1, &[]);
        assert!(state.check("terminal:a").is_ok());

        let result = state.check("terminal:a");
        assert!(result.is_err());
        assert!(result.unwrap_err() >= 1);
    }

    #[test]
    fn test_rate_limiter_keys_are_independent() {
        let state = RateLimiterState::new(1, &[]);
        assert!(state.check("terminal:a").is_ok());
        assert!(state.check("terminal:b").is_ok());
        assert!(state.check("terminal:a").is_err());
        assert!(state.check("terminal:b").is_err());
        assert_eq!(state.tracked_keys(), 2);
    }

    #[test]
    fn test_rate_limiter_burst_up_to_limit() {
        let state = RateLimiterState::new(5, &[]);
        for i in 0..5 {
            assert!(state.check("terminal:x").is_ok(), "request {} allowed", i);
        }
        assert!(state.check("terminal:x").is_err());
    }

    #[test]
    fn test_listed_terminal_gets_own_bucket() {
        let state = RateLimiterState::new(1, &terminals());
        assert_eq!(
            state.key_for(&terminal_header("food-stall-3"), peer("10.0.0.1")),
            "terminal:food-stall-3"
        );
        assert_eq!(
            state.key_for(&terminal_header(" drinks-1 "), None),
            "terminal:drinks-1"
        );
    }

    #[test]
    fn test_unlisted_terminal_falls_back_to_peer_address() {
        let state = RateLimiterState::new(1, &terminals());
        assert_eq!(
            state.key_for(&terminal_header("made-up-7"), peer("203.0.113.9")),
            "ip:203.0.113.9"
        );
        assert_eq!(state.key_for(&terminal_header("made-up-7"), None), "anonymous");
        assert_eq!(state.key_for(&HeaderMap::new(), None), "anonymous");
    }

    #[test]
    fn test_rotating_terminal_header_shares_one_bucket() {
        let state = RateLimiterState::new(1, &terminals());
        let mut rejected = 0;
        for i in 0..1_000 {
            let headers = terminal_header(&format!("guess-{}", i));
            let key = state.key_for(&headers, peer("198.51.100.4"));
            if state.check(&key).is_err() {
                rejected += 1;
            }
        }
        assert_eq!(rejected, 999);
        assert_eq!(state.tracked_keys(), 1);
    }

    #[test]
    fn test_tracked_keys_are_pruned_past_the_cap() {
        // One cell refills every millisecond.
        let state = RateLimiterState::new(60_000, &[]);
        for i in 0..MAX_TRACKED_KEYS {
            assert!(state.check(&format!("ip:{}", i)).is_ok());
        }
        assert_eq!(state.tracked_keys(), MAX_TRACKED_KEYS);

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(state.check("ip:late").is_ok());
        assert!(state.tracked_keys() < 10);
    }
}
