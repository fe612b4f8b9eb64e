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

/// Create a rate limiter with the specified messages per second
pub fn create_limiter(per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Max intent frames accepted from the remote per second (two per render tick)
pub const INTENT_RATE_LIMIT: u32 = 120;

/// Per-connection intake limiter
#[derive(Clone)]
pub struct IntakeLimiter {
    intent_limiter: Arc<Limiter>,
}

impl IntakeLimiter {
    pub fn new() -> Self {
        Self::with_rate(INTENT_RATE_LIMIT)
    }

    pub fn with_rate(per_second: u32) -> Self {
        Self {
            intent_limiter: create_limiter(per_second),
        }
    }

    /// Check if an intent frame is allowed (returns true if allowed)
    pub fn check_intent(&self) -> bool {
        self.intent_limiter.check().is_ok()
    }
}

impl Default for IntakeLimiter {
    fn default() -> Self {
        Self::new()
    }
}
