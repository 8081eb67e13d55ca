//! Per-source request spacing.
//!
//! Tracks when each quote source was last queried and sleeps until
//! `min_delay * attempt` has passed since then. State lives for one run only;
//! nothing here is persisted.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
pub struct RateLimiter {
    last_request: HashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time still to wait before `source` may be queried on `attempt`.
    pub fn wait_time(&self, source: &str, min_delay: Duration, attempt: u32) -> Duration {
        let Some(last) = self.last_request.get(source) else {
            return Duration::ZERO;
        };
        let required = min_delay.saturating_mul(attempt.max(1));
        let elapsed = Instant::now().saturating_duration_since(*last);
        required.saturating_sub(elapsed)
    }

    /// Block until `source` may be queried again. Returns how long we slept.
    pub async fn acquire(&self, source: &str, min_delay: Duration, attempt: u32) -> Duration {
        let wait = self.wait_time(source, min_delay, attempt);
        if !wait.is_zero() {
            debug!(
                source,
                attempt,
                wait_ms = wait.as_millis() as u64,
                "sleeping before quote request"
            );
            tokio::time::sleep(wait).await;
        }
        wait
    }

    /// Mark a request to `source` as finished now. Call after the request completes.
    pub fn record(&mut self, source: &str) {
        self.last_request.insert(source.to_string(), Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(12);

    #[tokio::test(start_paused = true)]
    async fn test_first_request_never_waits() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.acquire("alphavantage", DELAY, 1).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_remaining_delay() {
        let mut limiter = RateLimiter::new();
        limiter.record("alphavantage");
        tokio::time::advance(Duration::from_secs(5)).await;

        let start = Instant::now();
        let slept = limiter.acquire("alphavantage", DELAY, 1).await;
        assert_eq!(slept, Duration::from_secs(7));
        assert!(start.elapsed() >= Duration::from_secs(7));
        assert!(start.elapsed() < Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_scales_with_attempt() {
        let mut limiter = RateLimiter::new();
        limiter.record("alphavantage");

        assert_eq!(
            limiter.wait_time("alphavantage", DELAY, 3),
            Duration::from_secs(36)
        );
        let start = Instant::now();
        limiter.acquire("alphavantage", DELAY, 3).await;
        assert!(start.elapsed() >= DELAY * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sources_are_tracked_independently() {
        let mut limiter = RateLimiter::new();
        limiter.record("alphavantage");
        assert_eq!(limiter.wait_time("yahoo_json", DELAY, 1), Duration::ZERO);
        assert_eq!(limiter.wait_time("alphavantage", DELAY, 1), DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_once_delay_has_passed() {
        let mut limiter = RateLimiter::new();
        limiter.record("alphavantage");
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(limiter.acquire("alphavantage", DELAY, 2).await, Duration::ZERO);
    }
}
