use anyhow::Result;

use super::Quote;

/// Looks up one symbol at one quote source.
///
/// `Ok(None)` means the source had nothing for the symbol on this attempt.
/// Errors are never fatal to a run; callers treat them like `Ok(None)`.
#[async_trait::async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch(&self, symbol: &str, source: &str) -> Result<Option<Quote>>;

    fn name(&self) -> &str;
}
