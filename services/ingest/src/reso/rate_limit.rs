use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Minimum-interval gate in front of every source API request.
///
/// The quota is one request per `60s / requests_per_minute` with a burst of one, so two
/// consecutive calls are never closer than the interval. Clones share the same gate.
#[derive(Clone)]
pub struct RequestGate {
    limiter: Arc<DirectRateLimiter>,
    interval: Duration,
}

impl RequestGate {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let interval = Duration::from_secs(60) / rpm;
        let quota = Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Suspend until the interval since the previous request has elapsed.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate")
            .field("interval", &self.interval)
            .finish()
    }
}
