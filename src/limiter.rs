use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide token bucket limiting outbound solver requests.
///
/// One instance is shared by every call into the solver, whichever caller
/// issued it. `acquire` suspends until a slot frees, so concurrent scrapes
/// queue on the bucket instead of independently sleeping. Burst capacity is a
/// single token: requests space out evenly at the configured rate.
pub struct RateLimiter {
    state: Mutex<BucketState>,
    refill_per_sec: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

const BURST_CAPACITY: f64 = 1.0;

impl RateLimiter {
    /// A limiter allowing `requests_per_minute` acquisitions per minute.
    ///
    /// Rates below 1 are clamped up; a zero rate would deadlock every caller.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: BURST_CAPACITY,
                last_refill: Instant::now(),
            }),
            refill_per_sec: f64::from(requests_per_minute.max(1)) / 60.0,
        }
    }

    /// Wait until a request is allowed under the rate limit.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }

                let needed = 1.0 - state.tokens;
                Duration::from_secs_f64((needed / self.refill_per_sec).max(0.001))
            };

            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(BURST_CAPACITY);
        state.last_refill = now;
    }
}
