//! Per-client request rate limiting

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota};

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::AppState;

pub type ClientRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// `max_requests` per `window`, replenished evenly across the window
pub fn build_limiter(config: &RateLimitConfig) -> Arc<ClientRateLimiter> {
    let period = config.window / config.max_requests.get();
    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(config.max_requests))
        .allow_burst(config.max_requests);
    Arc::new(ClientRateLimiter::keyed(quota))
}

/// Reject requests from clients that have exhausted their quota.
///
/// Requests without a peer address (e.g. in-process tests) share one bucket.
pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if state.limiter.check_key(&client).is_err() {
        tracing::warn!("Rate limit exceeded for {}", client);
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;
    use std::time::Duration;

    #[test]
    fn burst_equals_max_requests() {
        let limiter = build_limiter(&RateLimitConfig {
            max_requests: NonZeroU32::new(3).unwrap(),
            window: Duration::from_secs(900),
        });
        let client = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        for _ in 0..3 {
            assert!(limiter.check_key(&client).is_ok());
        }
        assert!(limiter.check_key(&client).is_err());
        assert!(limiter.check_key(&other).is_ok());
    }
}
