use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Namespaces that hold plain currencies. Currencies are priced implicitly
/// and never need an external quote.
pub const CURRENCY_NAMESPACES: &[&str] = &["CURRENCY", "ISO4217"];

/// Namespace used when resolving a quote's currency code.
pub const ISO4217: &str = "ISO4217";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid commodity reference {value:?}: expected NAMESPACE:SYMBOL")]
pub struct CommodityIdError {
    value: String,
}

/// Identity of a commodity: namespace plus symbol.
///
/// Serialized as `NAMESPACE:SYMBOL` so ledger files can reference commodities
/// from accounts and price records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommodityId {
    namespace: String,
    symbol: String,
}

impl CommodityId {
    pub fn new(namespace: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            symbol: symbol.into(),
        }
    }

    pub fn currency(code: impl Into<String>) -> Self {
        Self::new(ISO4217, code)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl fmt::Display for CommodityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.symbol)
    }
}

impl FromStr for CommodityId {
    type Err = CommodityIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Symbols may contain ':' (e.g. exchange-qualified tickers); split on the first one.
        match value.split_once(':') {
            Some((namespace, symbol)) if !namespace.is_empty() && !symbol.is_empty() => {
                Ok(Self::new(namespace, symbol))
            }
            _ => Err(CommodityIdError {
                value: value.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for CommodityId {
    type Error = CommodityIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommodityId> for String {
    fn from(value: CommodityId) -> Self {
        value.to_string()
    }
}

/// A tradable commodity declared in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    pub namespace: String,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Name of the quote source to fetch prices from. `None` means "do not fetch".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Commodity {
    pub fn new(namespace: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            symbol: symbol.into(),
            full_name: None,
            quote_source: None,
            extra: Map::new(),
        }
    }

    pub fn with_quote_source(mut self, source: impl Into<String>) -> Self {
        self.quote_source = Some(source.into());
        self
    }

    pub fn id(&self) -> CommodityId {
        CommodityId::new(&self.namespace, &self.symbol)
    }

    pub fn is_currency(&self) -> bool {
        CURRENCY_NAMESPACES.contains(&self.namespace.as_str())
    }

    /// Symbol as shown to users and sent to the quote helper.
    pub fn display_symbol(&self) -> &str {
        self.symbol.trim()
    }
}
