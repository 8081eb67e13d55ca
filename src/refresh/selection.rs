use std::collections::BTreeMap;

use anyhow::Result;
use rust_decimal::Decimal;
use tracing::debug;

use crate::ledger::Portfolio;
use crate::models::{Commodity, CommodityId};

/// Commodities held with a positive balance in stock or mutual-fund accounts.
///
/// Currencies are skipped, and a commodity held in several accounts appears once.
pub fn select_commodities(portfolio: &dyn Portfolio) -> Result<Vec<Commodity>> {
    let mut selected: BTreeMap<CommodityId, Commodity> = BTreeMap::new();

    for account in portfolio.descendants() {
        if !account.account_type.holds_security() {
            continue;
        }
        let Some(id) = &account.commodity else {
            debug!(account = %account.name, "holding account has no commodity");
            continue;
        };
        if account.balance()? <= Decimal::ZERO {
            continue;
        }
        let Some(commodity) = portfolio.commodity(id) else {
            continue;
        };
        if commodity.is_currency() {
            continue;
        }
        selected
            .entry(id.clone())
            .or_insert_with(|| commodity.clone());
    }

    Ok(selected.into_values().collect())
}
