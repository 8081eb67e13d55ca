mod fetcher;
mod helper;
mod parser;
mod rate_limit;
mod retry;
mod sources;

pub use fetcher::QuoteFetcher;
pub use helper::{HelperCommand, HelperFetcher, DEFAULT_HELPER_PROGRAM, DEFAULT_HELPER_TIMEOUT};
pub use parser::{parse_quote_time, HelperResponse, Quote, ResponseParser};
pub use rate_limit::RateLimiter;
pub use retry::{RetryController, RetryOutcome, RetryPolicy, DEFAULT_MAX_RETRIES};
pub use sources::{QuoteSources, ALPHAVANTAGE_MIN_DELAY};
