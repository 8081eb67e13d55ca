use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::CommodityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Root,
    Asset,
    Bank,
    Cash,
    Credit,
    /// Holding of a single stock.
    Stock,
    /// Holding of a single mutual fund.
    Mutual,
    Liability,
    Income,
    Expense,
    Equity,
    Trading,
}

impl AccountType {
    /// Account types whose commodity is a security that needs a market quote.
    pub fn holds_security(self) -> bool {
        matches!(self, AccountType::Stock | AccountType::Mutual)
    }
}

fn default_balance() -> String {
    "0".to_string()
}

fn is_zero_balance(balance: &String) -> bool {
    balance == "0"
}

/// A node in the ledger's account hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commodity: Option<CommodityId>,
    /// Balance in units of `commodity`, kept as a decimal string.
    #[serde(default = "default_balance", skip_serializing_if = "is_zero_balance")]
    pub balance: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Account>,
    /// Fields this crate does not interpret, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Account {
    pub fn new(name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            name: name.into(),
            account_type,
            commodity: None,
            balance: default_balance(),
            children: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Convenience constructor for a security holding.
    pub fn holding(
        name: impl Into<String>,
        account_type: AccountType,
        commodity: CommodityId,
        balance: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            account_type,
            commodity: Some(commodity),
            balance: balance.into(),
            children: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_child(mut self, child: Account) -> Self {
        self.children.push(child);
        self
    }

    pub fn balance(&self) -> Result<Decimal> {
        Decimal::from_str(self.balance.trim())
            .with_context(|| format!("Invalid balance {:?} on account {}", self.balance, self.name))
    }

    /// All accounts below this one, depth first. Does not include `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Account>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Account;

    fn next(&mut self) -> Option<Self::Item> {
        let account = self.stack.pop()?;
        self.stack.extend(account.children.iter().rev());
        Some(account)
    }
}
