use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::ledger::PriceSink;
use crate::models::{Commodity, FINANCE_QUOTE_SOURCE};
use crate::quotes::{
    QuoteFetcher, QuoteSources, RateLimiter, RetryController, RetryOutcome, RetryPolicy,
};

/// What happened during one pass over the ordered commodities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Symbols a lookup was attempted for, in order.
    pub attempted: Vec<String>,
    /// Symbols that received a price, in order.
    pub priced: Vec<String>,
    /// Symbol whose lookup failed and ended the run.
    pub stopped_at: Option<String>,
}

impl RunReport {
    pub fn last_success(&self) -> Option<&str> {
        self.priced.last().map(String::as_str)
    }
}

/// Fetches and records prices for commodities in order, stopping at the first miss.
///
/// The next run resumes from the checkpoint.
pub struct PriceUpdater<'a> {
    fetcher: &'a dyn QuoteFetcher,
    sources: &'a QuoteSources,
    policy: RetryPolicy,
    clock: &'a dyn Clock,
}

impl<'a> PriceUpdater<'a> {
    pub fn new(
        fetcher: &'a dyn QuoteFetcher,
        sources: &'a QuoteSources,
        policy: RetryPolicy,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            fetcher,
            sources,
            policy,
            clock,
        }
    }

    pub async fn run(&self, ordered: &[Commodity], sink: &mut dyn PriceSink) -> Result<RunReport> {
        let mut limiter = RateLimiter::new();
        let mut report = RunReport::default();

        for commodity in ordered {
            let symbol = commodity.display_symbol();
            let Some(source_name) = commodity.quote_source.as_deref() else {
                debug!(symbol, "no quote source assigned, skipping");
                continue;
            };
            let source = self.sources.get(source_name);
            debug!(
                symbol,
                name = commodity.full_name.as_deref().unwrap_or(""),
                source = %source.name,
                fetcher = self.fetcher.name(),
                "fetching quote"
            );
            report.attempted.push(symbol.to_string());

            let outcome = RetryController::new(self.fetcher, &mut limiter, &self.policy)
                .get_quote(symbol, &source)
                .await;

            let quote = match outcome {
                RetryOutcome::Found { quote, .. } => quote,
                RetryOutcome::NotFound { attempts } | RetryOutcome::Exhausted { attempts } => {
                    warn!(symbol, source = %source.name, attempts, "no price obtained, stopping run");
                    report.stopped_at = Some(symbol.to_string());
                    break;
                }
            };

            let observation = match quote.to_observation(self.clock, FINANCE_QUOTE_SOURCE) {
                Ok(observation) => observation,
                Err(err) => {
                    error!(symbol, error = %format!("{err:#}"), "unusable quote, stopping run");
                    report.stopped_at = Some(symbol.to_string());
                    break;
                }
            };

            let currency = sink.currency(&observation.currency);
            sink.add_price(commodity, &currency, &observation)?;
            info!(
                symbol,
                value = %observation.value,
                currency = %currency,
                time = %observation.time,
                "price recorded"
            );
            report.priced.push(symbol.to_string());
        }

        Ok(report)
    }
}
