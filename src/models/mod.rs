mod account;
mod commodity;
mod price;
mod quote_source;

pub use account::{Account, AccountType, Descendants};
pub use commodity::{Commodity, CommodityId, CommodityIdError, CURRENCY_NAMESPACES, ISO4217};
pub use price::{PriceObservation, PriceRecord, FINANCE_QUOTE_SOURCE};
pub use quote_source::QuoteSource;
