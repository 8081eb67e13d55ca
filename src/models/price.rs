use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CommodityId;

/// Source tag stored on prices that came from the quote helper.
pub const FINANCE_QUOTE_SOURCE: &str = "Finance::Quote";

/// The result of one successful quote fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    /// Exact decimal value; never round-tripped through floating point.
    pub value: Decimal,
    /// Currency code as reported by the provider (e.g. "USD").
    pub currency: String,
    pub time: DateTime<Utc>,
    pub source: String,
}

/// A price as persisted in the ledger's price database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub commodity: CommodityId,
    pub currency: CommodityId,
    pub time: DateTime<Utc>,
    pub value: String,
    pub source: String,
}

impl PriceRecord {
    pub fn from_observation(
        commodity: CommodityId,
        currency: CommodityId,
        observation: &PriceObservation,
    ) -> Self {
        Self {
            commodity,
            currency,
            time: observation.time,
            value: observation.value.normalize().to_string(),
            source: observation.source.clone(),
        }
    }
}
