use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::QuoteSource;

/// Alpha Vantage allows 5 requests per minute on the free tier.
pub const ALPHAVANTAGE_MIN_DELAY: Duration = Duration::from_secs(12);

/// Minimum request spacing per quote source name. Sources not listed are
/// unthrottled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSources {
    delays: BTreeMap<String, Duration>,
}

impl Default for QuoteSources {
    fn default() -> Self {
        Self::empty().with_delay("alphavantage", ALPHAVANTAGE_MIN_DELAY)
    }
}

impl QuoteSources {
    pub fn empty() -> Self {
        Self {
            delays: BTreeMap::new(),
        }
    }

    pub fn with_delay(mut self, name: impl Into<String>, min_delay: Duration) -> Self {
        self.set_delay(name, min_delay);
        self
    }

    pub fn set_delay(&mut self, name: impl Into<String>, min_delay: Duration) {
        self.delays.insert(name.into(), min_delay);
    }

    pub fn get(&self, name: &str) -> QuoteSource {
        QuoteSource {
            name: name.to_string(),
            min_delay: self.delays.get(name).copied(),
        }
    }
}
