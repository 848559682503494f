//! Cooldown limiter pacing issue-creation requests against the Jira server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum interval between request starts; clones share the same clock.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Creates a limiter with the given cooldown.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Waits for the next free slot and reserves the one after it.
    pub async fn hit(&self) {
        if self.cooldown.is_zero() {
            return;
        }
        let mut guard = self.next_slot.lock().await;
        let now = Instant::now();
        let start = match *guard {
            Some(slot) if slot > now => {
                sleep_until(slot).await;
                slot
            }
            _ => now,
        };
        *guard = Some(start + self.cooldown);
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::RateLimiter;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn unlimited_limiter_never_waits() {
        let limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.hit().await;
        }
        assert!(start.elapsed() < Duration::from_millis(20));
        assert_eq!(limiter.cooldown(), Duration::ZERO);
    }

    #[tokio::test]
    async fn clones_share_the_cooldown_window() {
        let limiter = RateLimiter::new(Duration::from_millis(40));
        let clone = limiter.clone();

        limiter.hit().await;
        let start = Instant::now();
        clone.hit().await;

        assert!(start.elapsed() >= Duration::from_millis(35));
    }
}
