//! Parser for the quote helper's one-line response.
//!
//! A hit is an association list keyed by symbol:
//!
//! ```text
//! (("IBM" (symbol . "IBM") (gnc:time-no-zone . "2024-03-01 16:00:00") (last . 185.03) (currency . "USD")))
//! ```
//!
//! A miss is the literal `#f`. Anything else is malformed.

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::warn;

use crate::clock::Clock;
use crate::models::PriceObservation;

/// Keys that carry the quoted price, in order of preference.
const PRICE_KEYS: &[&str] = &["last", "nav", "price"];

/// Keys that carry the as-of time, in order of preference.
const DATE_KEYS: &[&str] = &["gnc:time-no-zone", "date"];

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// Fields of a successful lookup, kept as text until converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub symbol: String,
    /// Decimal string exactly as the helper printed it.
    pub price: String,
    pub currency: String,
    pub date: Option<String>,
}

impl Quote {
    /// Build a price observation. A missing or unreadable date falls back to `clock.now()`.
    pub fn to_observation(&self, clock: &dyn Clock, source: &str) -> Result<PriceObservation> {
        let value = Decimal::from_str(&self.price)
            .with_context(|| format!("Invalid price {:?} for {}", self.price, self.symbol))?;

        let time = match self.date.as_deref() {
            Some(raw) => parse_quote_time(raw, clock).unwrap_or_else(|| {
                warn!(symbol = %self.symbol, date = raw, "unrecognised quote date, using now");
                clock.now()
            }),
            None => clock.now(),
        };

        Ok(PriceObservation {
            value,
            currency: self.currency.clone(),
            time,
            source: source.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperResponse {
    Found(Quote),
    NotFound,
    Malformed(String),
}

pub struct ResponseParser {
    record: Regex,
    field: Regex,
}

impl ResponseParser {
    pub fn new() -> Result<Self> {
        let record = Regex::new(
            r#"^\(\(\s*"(?P<symbol>[^"]+)"(?P<fields>(?:\s*\([^()]*\))*)\s*\)\)$"#,
        )
        .context("Failed to compile quote record pattern")?;
        let field = Regex::new(
            r#"\(\s*(?P<key>[A-Za-z][A-Za-z0-9:_\-]*)\s+\.\s+(?:"(?P<quoted>[^"]*)"|(?P<bare>[^\s()"]+))\s*\)"#,
        )
        .context("Failed to compile quote field pattern")?;
        Ok(Self { record, field })
    }

    pub fn parse(&self, output: &str) -> HelperResponse {
        let output = output.trim();
        if output.starts_with("#f") {
            return HelperResponse::NotFound;
        }

        let Some(caps) = self.record.captures(output) else {
            return HelperResponse::Malformed("output is not a quote record".to_string());
        };
        let symbol = caps["symbol"].to_string();
        let fields = caps.name("fields").map(|m| m.as_str()).unwrap_or_default();

        let mut pairs: Vec<(String, String)> = Vec::new();
        for field in self.field.captures_iter(fields) {
            let value = field
                .name("quoted")
                .or_else(|| field.name("bare"))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            pairs.push((field["key"].to_string(), value));
        }
        let lookup = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        let Some(price) = PRICE_KEYS.iter().find_map(|&k| lookup(k)) else {
            return HelperResponse::Malformed(format!("no price field for {symbol}"));
        };
        if Decimal::from_str(&price).is_err() {
            return HelperResponse::Malformed(format!("price {price:?} is not a decimal"));
        }
        let Some(currency) = lookup("currency").filter(|c| !c.trim().is_empty()) else {
            return HelperResponse::Malformed(format!("no currency field for {symbol}"));
        };
        let date = DATE_KEYS.iter().find_map(|&k| lookup(k));

        HelperResponse::Found(Quote {
            symbol,
            price,
            currency: currency.trim().to_string(),
            date,
        })
    }
}

/// Parse a provider timestamp: either `YYYY-MM-DD HH:MM:SS` or a bare date.
pub fn parse_quote_time(raw: &str, clock: &dyn Clock) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Some(clock.resolve_naive(naive));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| clock.resolve_naive(naive))
}
