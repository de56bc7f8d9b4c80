//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Inbound WebSocket messages per connection per second.
/// Pointer moves arrive at display rate or faster.
pub const INPUT_RATE_LIMIT: u32 = 240;

/// Per-connection rate limiter state
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    input_limiter: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new() -> Self {
        Self::with_rate(INPUT_RATE_LIMIT)
    }

    pub fn with_rate(per_second: u32) -> Self {
        Self {
            input_limiter: create_limiter(per_second),
        }
    }

    /// Check if an input message is allowed (returns true if allowed)
    pub fn check_input(&self) -> bool {
        self.input_limiter.check().is_ok()
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_quota_is_refused() {
        let limiter = ConnectionRateLimiter::with_rate(3);
        let allowed = (0..10).filter(|_| limiter.check_input()).count();
        assert_eq!(allowed, 3);
    }
}
