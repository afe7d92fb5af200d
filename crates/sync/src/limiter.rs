//! Job-start rate limiting.
//!
//! A token bucket shared by all workers in the pool. Pool width controls how
//! many jobs run in parallel; the gate controls how fast new ones start, so
//! the external progress source never sees burst load regardless of width.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};

struct GateState {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket gate a worker must pass before claiming a job.
pub struct RateGate {
    state: Mutex<GateState>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateGate {
    /// Allow at most `max_starts` job starts per `interval`, shared across
    /// all callers.
    pub fn new(max_starts: u32, interval: Duration) -> Self {
        let capacity = f64::from(max_starts.max(1));
        let refill_per_sec = capacity / interval.as_secs_f64().max(f64::EPSILON);
        Self {
            state: Mutex::new(GateState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_per_sec,
        }
    }

    /// Wait until a start token is available and consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };
            sleep(wait).await;
        }
    }
}
