#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ledger_quotes::ledger::Ledger;
use ledger_quotes::models::{Account, AccountType, Commodity};
use ledger_quotes::quotes::{Quote, QuoteFetcher};

pub fn quote(symbol: &str, price: &str) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        price: price.to_string(),
        currency: "USD".to_string(),
        date: Some("2024-01-02 16:00:00".to_string()),
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 3, 9, 30, 0).unwrap()
}

/// Fetcher answering from per-symbol scripts.
///
/// Each call pops the next scripted answer for the symbol. Once a script is
/// empty the fetcher keeps returning `Ok(None)`.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Option<Quote>>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `symbol` with a quote on its next lookup.
    pub fn with_quote(self, symbol: &str, price: &str) -> Self {
        self.push(symbol, Some(quote(symbol, price)));
        self
    }

    /// Answer `symbol` with `count` misses before whatever is scripted next.
    pub fn with_misses(self, symbol: &str, count: usize) -> Self {
        for _ in 0..count {
            self.push(symbol, None);
        }
        self
    }

    fn push(&self, symbol: &str, answer: Option<Quote>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push_back(answer);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn symbols_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|(symbol, _)| symbol).collect()
    }
}

#[async_trait]
impl QuoteFetcher for ScriptedFetcher {
    async fn fetch(&self, symbol: &str, source: &str) -> Result<Option<Quote>> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), source.to_string()));
        let answer = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(symbol)
            .and_then(VecDeque::pop_front)
            .flatten();
        Ok(answer)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A holding for `build_ledger`: symbol, quote source, balance.
pub struct Holding<'a> {
    pub symbol: &'a str,
    pub source: Option<&'a str>,
    pub balance: &'a str,
}

pub fn held<'a>(symbol: &'a str, source: &'a str) -> Holding<'a> {
    Holding {
        symbol,
        source: Some(source),
        balance: "10",
    }
}

/// Ledger with a checking account plus one stock account per holding.
pub fn build_ledger(holdings: &[Holding<'_>]) -> Ledger {
    let mut root = Account::new("Root", AccountType::Root).with_child(Account::holding(
        "Checking",
        AccountType::Bank,
        ledger_quotes::models::CommodityId::currency("USD"),
        "2500.00",
    ));
    let mut commodities = Vec::new();

    let mut investments = Account::new("Brokerage", AccountType::Asset);
    for holding in holdings {
        let mut commodity = Commodity::new("NASDAQ", holding.symbol);
        if let Some(source) = holding.source {
            commodity = commodity.with_quote_source(source);
        }
        investments = investments.with_child(Account::holding(
            holding.symbol,
            AccountType::Stock,
            commodity.id(),
            holding.balance,
        ));
        commodities.push(commodity);
    }
    root = root.with_child(investments);

    commodities
        .into_iter()
        .fold(Ledger::new(root), |ledger, c| ledger.with_commodity(c))
}

pub async fn write_ledger(dir: &Path, ledger: &Ledger) -> Result<PathBuf> {
    let path = dir.join("book.json");
    ledger.save(&path).await?;
    Ok(path.canonicalize()?)
}
