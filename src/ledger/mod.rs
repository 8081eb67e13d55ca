//! JSON ledger file: account hierarchy, commodity table and price database.
//!
//! ```text
//! {
//!   "commodities": [{"namespace": "NASDAQ", "symbol": "AAPL", "quote_source": "alphavantage"}],
//!   "root": {"name": "Root", "type": "root", "children": [...]},
//!   "prices": [{"commodity": "NASDAQ:AAPL", "currency": "ISO4217:USD", ...}]
//! }
//! ```

mod lock;

pub use lock::{is_locked, lock_path};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;

use crate::models::{
    Account, AccountType, Commodity, CommodityId, Descendants, PriceObservation, PriceRecord,
};

/// Destination for fetched prices.
pub trait PriceSink {
    /// Reference for a currency code reported by a quote.
    fn currency(&self, code: &str) -> CommodityId {
        CommodityId::currency(code.trim().to_uppercase())
    }

    fn add_price(
        &mut self,
        commodity: &Commodity,
        currency: &CommodityId,
        observation: &PriceObservation,
    ) -> Result<()>;
}

/// Read access to an account hierarchy and its commodities.
pub trait Portfolio {
    fn root(&self) -> &Account;

    fn commodity(&self, id: &CommodityId) -> Option<&Commodity>;

    fn descendants(&self) -> Descendants<'_> {
        self.root().descendants()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    commodities: Vec<Commodity>,
    root: Account,
    #[serde(default)]
    prices: Vec<PriceRecord>,
    /// Top-level sections owned by other tools, preserved across a save.
    #[serde(flatten)]
    extra: Map<String, Value>,
    #[serde(skip)]
    index: HashMap<CommodityId, usize>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Account::new("Root", AccountType::Root))
    }
}

impl Ledger {
    pub fn new(root: Account) -> Self {
        Self {
            commodities: Vec::new(),
            root,
            prices: Vec::new(),
            extra: Map::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_commodity(mut self, commodity: Commodity) -> Self {
        self.insert_commodity(commodity);
        self
    }

    pub fn insert_commodity(&mut self, commodity: Commodity) {
        let id = commodity.id();
        match self.index.get(&id) {
            Some(&pos) => self.commodities[pos] = commodity,
            None => {
                self.index.insert(id, self.commodities.len());
                self.commodities.push(commodity);
            }
        }
    }

    pub fn commodities(&self) -> &[Commodity] {
        &self.commodities
    }

    pub fn prices(&self) -> &[PriceRecord] {
        &self.prices
    }

    /// Parse a ledger document and check that every account references a declared commodity.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut ledger: Ledger =
            serde_json::from_str(content).context("Failed to parse ledger JSON")?;
        ledger.rebuild_index();
        ledger.validate()?;
        Ok(ledger)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read ledger file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to load ledger file: {}", path.display()))
    }

    /// Write the ledger back to `path`, replacing the file atomically.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize ledger")?;

        let file_name = path
            .file_name()
            .with_context(|| format!("Ledger path has no file name: {}", path.display()))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("Failed to replace ledger file: {}", path.display()))?;
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .commodities
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.id(), pos))
            .collect();
    }

    fn validate(&self) -> Result<()> {
        for account in std::iter::once(&self.root).chain(self.root.descendants()) {
            if let Some(id) = &account.commodity {
                if !self.index.contains_key(id) && !is_currency_ref(id) {
                    anyhow::bail!(
                        "Account {} references undeclared commodity {}",
                        account.name,
                        id
                    );
                }
            }
        }
        Ok(())
    }
}

fn is_currency_ref(id: &CommodityId) -> bool {
    crate::models::CURRENCY_NAMESPACES.contains(&id.namespace())
}

impl Portfolio for Ledger {
    fn root(&self) -> &Account {
        &self.root
    }

    fn commodity(&self, id: &CommodityId) -> Option<&Commodity> {
        self.index.get(id).map(|&pos| &self.commodities[pos])
    }
}

impl PriceSink for Ledger {
    fn add_price(
        &mut self,
        commodity: &Commodity,
        currency: &CommodityId,
        observation: &PriceObservation,
    ) -> Result<()> {
        self.prices.push(PriceRecord::from_observation(
            commodity.id(),
            currency.clone(),
            observation,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "commodities": [
            {"namespace": "NASDAQ", "symbol": "AAPL", "full_name": "Apple Inc.", "quote_source": "alphavantage"}
        ],
        "root": {
            "name": "Root",
            "type": "root",
            "children": [
                {"name": "Checking", "type": "bank", "commodity": "ISO4217:USD", "balance": "1200.00"},
                {"name": "Apple", "type": "stock", "commodity": "NASDAQ:AAPL", "balance": "12"}
            ]
        }
    }"#;

    #[test]
    fn test_parse_sample_ledger() -> Result<()> {
        let ledger = Ledger::from_json(SAMPLE)?;
        let apple = ledger
            .commodity(&CommodityId::new("NASDAQ", "AAPL"))
            .expect("commodity should be indexed");
        assert_eq!(apple.quote_source.as_deref(), Some("alphavantage"));
        assert_eq!(ledger.descendants().count(), 2);
        assert!(ledger.prices().is_empty());
        Ok(())
    }

    #[test]
    fn test_undeclared_commodity_is_rejected() {
        let content = r#"{
            "root": {"name": "Root", "type": "root", "children": [
                {"name": "Mystery", "type": "stock", "commodity": "NYSE:XYZ", "balance": "1"}
            ]}
        }"#;
        let err = Ledger::from_json(content).unwrap_err();
        assert!(format!("{err:#}").contains("NYSE:XYZ"));
    }

    #[test]
    fn test_currency_lookup_uses_iso_namespace() {
        let ledger = Ledger::default();
        assert_eq!(ledger.currency("usd"), CommodityId::new("ISO4217", "USD"));
    }

    #[tokio::test]
    async fn test_save_and_reload_keeps_prices() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("book.json");

        let mut ledger = Ledger::from_json(SAMPLE)?;
        let apple = ledger.commodities()[0].clone();
        let observation = PriceObservation {
            value: Decimal::new(18950, 2),
            currency: "USD".to_string(),
            time: Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap(),
            source: "Finance::Quote".to_string(),
        };
        let usd = ledger.currency(&observation.currency);
        ledger.add_price(&apple, &usd, &observation)?;
        ledger.save(&path).await?;

        assert!(!dir.path().join("book.json.tmp").exists());

        let reloaded = Ledger::load(&path).await?;
        assert_eq!(reloaded.prices().len(), 1);
        assert_eq!(reloaded.prices()[0].value, "189.5");
        assert_eq!(reloaded.prices()[0].commodity, apple.id());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_keeps_fields_it_does_not_know() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("book.json");
        let content = r#"{
            "book_id": "f3a1",
            "transactions": [{"date": "2024-01-02", "amount": "-12.00"}],
            "commodities": [
                {"namespace": "NASDAQ", "symbol": "AAPL", "quote_source": "alphavantage", "cusip": "037833100"}
            ],
            "root": {"name": "Root", "type": "root", "children": [
                {"name": "Apple", "type": "stock", "commodity": "NASDAQ:AAPL", "balance": "12",
                 "notes": "RSU grant", "placeholder": false}
            ]}
        }"#;

        let mut ledger = Ledger::from_json(content)?;
        let apple = ledger.commodities()[0].clone();
        let observation = PriceObservation {
            value: Decimal::new(18950, 2),
            currency: "USD".to_string(),
            time: Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap(),
            source: "Finance::Quote".to_string(),
        };
        let usd = ledger.currency(&observation.currency);
        ledger.add_price(&apple, &usd, &observation)?;
        ledger.save(&path).await?;

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(saved["book_id"], "f3a1");
        assert_eq!(saved["transactions"][0]["amount"], "-12.00");
        assert_eq!(saved["commodities"][0]["cusip"], "037833100");
        let account = &saved["root"]["children"][0];
        assert_eq!(account["notes"], "RSU grant");
        assert_eq!(account["placeholder"], false);
        assert_eq!(saved["prices"].as_array().map(Vec::len), Some(1));

        let reloaded = Ledger::load(&path).await?;
        assert_eq!(reloaded.commodities()[0].quote_source.as_deref(), Some("alphavantage"));
        Ok(())
    }
}
