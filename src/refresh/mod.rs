//! The quote-acquisition pipeline: select, order, fetch, record.

mod driver;
mod ordering;
mod selection;

pub use driver::{PriceUpdater, RunReport};
pub use ordering::order_commodities;
pub use selection::select_commodities;
