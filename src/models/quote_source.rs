use std::time::Duration;

/// A named external price-data provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSource {
    pub name: String,
    /// Minimum spacing between requests. `None` means the source is not
    /// throttled and a miss is authoritative.
    pub min_delay: Option<Duration>,
}

impl QuoteSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_delay: None,
        }
    }

    pub fn throttled(name: impl Into<String>, min_delay: Duration) -> Self {
        Self {
            name: name.into(),
            min_delay: Some(min_delay),
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.min_delay.is_some()
    }
}
