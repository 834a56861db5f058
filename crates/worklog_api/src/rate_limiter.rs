//! Request pacing shared by every service client.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::time::sleep_until;

/// Spaces requests of one client at least `cooldown` apart. Concurrent callers each reserve the next
/// free slot and wait for it without holding the lock; clones share the same schedule.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// At most `per_second` requests per second; zero disables pacing.
    pub fn per_second(per_second: u32) -> Self {
        if per_second == 0 {
            return Self::unlimited();
        }
        Self::new(Duration::from_secs(1) / per_second)
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next = match self.next_slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let slot = next.map_or(now, |scheduled| scheduled.max(now));
        *next = Some(slot + self.cooldown);
        slot
    }

    /// Resolves once this caller's slot has come.
    pub async fn hit(&self) {
        if self.cooldown.is_zero() {
            return;
        }
        let slot = self.reserve();
        if slot > Instant::now() {
            sleep_until(slot.into()).await;
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
