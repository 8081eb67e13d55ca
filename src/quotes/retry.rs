//! Bounded retry around a [`QuoteFetcher`], spaced by the [`RateLimiter`].
//!
//! Only throttled sources are retried: a miss from a source with a minimum
//! delay is most likely a rate-limit rejection, while a miss from an
//! unthrottled source is taken at face value.

use tracing::{debug, warn};

use super::{Quote, QuoteFetcher, RateLimiter};
use crate::models::QuoteSource;

pub const DEFAULT_MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per symbol for throttled sources. Always at least 1.
    pub max_retries: u32,
    /// Whether the rate limiter also runs before the first attempt. When
    /// false it only spaces out retries.
    pub delay_first_attempt: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay_first_attempt: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            ..Self::default()
        }
    }

    pub fn with_delay_first_attempt(mut self, enabled: bool) -> Self {
        self.delay_first_attempt = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Found { quote: Quote, attempts: u32 },
    /// Unthrottled source reported no price; not retried.
    NotFound { attempts: u32 },
    /// Throttled source missed on every attempt.
    Exhausted { attempts: u32 },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Found { attempts, .. }
            | RetryOutcome::NotFound { attempts }
            | RetryOutcome::Exhausted { attempts } => *attempts,
        }
    }
}

pub struct RetryController<'a> {
    fetcher: &'a dyn QuoteFetcher,
    limiter: &'a mut RateLimiter,
    policy: &'a RetryPolicy,
}

impl<'a> RetryController<'a> {
    pub fn new(
        fetcher: &'a dyn QuoteFetcher,
        limiter: &'a mut RateLimiter,
        policy: &'a RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            policy,
        }
    }

    pub async fn get_quote(&mut self, symbol: &str, source: &QuoteSource) -> RetryOutcome {
        let max_retries = self.policy.max_retries.max(1);
        let mut attempt = 1;

        loop {
            if let Some(min_delay) = source.min_delay {
                if attempt > 1 || self.policy.delay_first_attempt {
                    self.limiter.acquire(&source.name, min_delay, attempt).await;
                }
            }

            let result = self.fetcher.fetch(symbol, &source.name).await;
            self.limiter.record(&source.name);

            let quote = match result {
                Ok(quote) => quote,
                Err(err) => {
                    warn!(symbol, source = %source.name, attempt, error = %format!("{err:#}"), "quote lookup failed");
                    None
                }
            };

            if let Some(quote) = quote {
                debug!(symbol, source = %source.name, attempt, price = %quote.price, "quote found");
                return RetryOutcome::Found {
                    quote,
                    attempts: attempt,
                };
            }

            if !source.is_throttled() {
                return RetryOutcome::NotFound { attempts: attempt };
            }

            if attempt >= max_retries {
                warn!(symbol, source = %source.name, attempts = attempt, "exhausted retries");
                return RetryOutcome::Exhausted { attempts: attempt };
            }

            debug!(symbol, source = %source.name, attempt, "no quote from throttled source, retrying");
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Misses `misses` times, then returns a quote. Records call times.
    struct FlakyFetcher {
        misses: u32,
        calls: AtomicU32,
        call_times: Mutex<Vec<Instant>>,
    }

    impl FlakyFetcher {
        fn new(misses: u32) -> Self {
            Self {
                misses,
                calls: AtomicU32::new(0),
                call_times: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl QuoteFetcher for FlakyFetcher {
        async fn fetch(&self, symbol: &str, _source: &str) -> Result<Option<Quote>> {
            self.call_times.lock().unwrap().push(Instant::now());
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.misses {
                return Ok(None);
            }
            Ok(Some(Quote {
                symbol: symbol.to_string(),
                price: "10.00".to_string(),
                currency: "USD".to_string(),
                date: None,
            }))
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    struct FailingFetcher;

    #[async_trait::async_trait]
    impl QuoteFetcher for FailingFetcher {
        async fn fetch(&self, _symbol: &str, _source: &str) -> Result<Option<Quote>> {
            anyhow::bail!("helper crashed")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_source_retries_until_bound() {
        let fetcher = FlakyFetcher::new(u32::MAX);
        let mut limiter = RateLimiter::new();
        let policy = RetryPolicy::new(3);
        let source = QuoteSource::throttled("alphavantage", Duration::from_secs(12));

        let outcome = RetryController::new(&fetcher, &mut limiter, &policy)
            .get_quote("IBM", &source)
            .await;

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 3 });
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unthrottled_source_is_queried_once() {
        let fetcher = FlakyFetcher::new(u32::MAX);
        let mut limiter = RateLimiter::new();
        let policy = RetryPolicy::new(5);
        let source = QuoteSource::new("yahoo_json");

        let outcome = RetryController::new(&fetcher, &mut limiter, &policy)
            .get_quote("IBM", &source)
            .await;

        assert_eq!(outcome, RetryOutcome::NotFound { attempts: 1 });
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_grows_with_attempt() {
        let fetcher = FlakyFetcher::new(2);
        let mut limiter = RateLimiter::new();
        let policy = RetryPolicy::new(5);
        let delay = Duration::from_secs(12);
        let source = QuoteSource::throttled("alphavantage", delay);

        let outcome = RetryController::new(&fetcher, &mut limiter, &policy)
            .get_quote("IBM", &source)
            .await;

        assert_eq!(outcome.attempts(), 3);
        assert!(matches!(
            outcome,
            RetryOutcome::Found { ref quote, .. } if quote.price == "10.00"
        ));

        let times = fetcher.call_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        assert!(times[1] - times[0] >= delay * 2);
        assert!(times[2] - times[1] >= delay * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_delay_can_be_skipped() {
        let fetcher = FlakyFetcher::new(0);
        let mut limiter = RateLimiter::new();
        limiter.record("alphavantage");
        let source = QuoteSource::throttled("alphavantage", Duration::from_secs(12));

        let eager = RetryPolicy::new(3).with_delay_first_attempt(false);
        let start = Instant::now();
        RetryController::new(&fetcher, &mut limiter, &eager)
            .get_quote("IBM", &source)
            .await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        let spaced = RetryPolicy::new(3);
        let start = Instant::now();
        RetryController::new(&fetcher, &mut limiter, &spaced)
            .get_quote("IBM", &source)
            .await;
        assert!(start.elapsed() >= Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_count_as_misses() {
        let mut limiter = RateLimiter::new();
        let policy = RetryPolicy::new(2);
        let source = QuoteSource::throttled("alphavantage", Duration::from_secs(1));

        let outcome = RetryController::new(&FailingFetcher, &mut limiter, &policy)
            .get_quote("IBM", &source)
            .await;
        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 2 });
    }

    #[test]
    fn test_policy_never_drops_below_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_retries, 1);
    }
}
