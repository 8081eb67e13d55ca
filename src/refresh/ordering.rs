//! Resume order for a set of commodities.
//!
//! Commodities are sorted by symbol and the sequence is rotated so the run
//! starts strictly after the checkpointed symbol, wrapping around to finish the
//! ones an earlier partial run never reached.

use std::cmp::Ordering;

use crate::models::Commodity;

fn by_symbol(a: &Commodity, b: &Commodity) -> Ordering {
    a.symbol
        .cmp(&b.symbol)
        .then_with(|| a.namespace.cmp(&b.namespace))
}

/// Sort `commodities` by symbol and rotate past `checkpoint`, if any.
pub fn order_commodities(mut commodities: Vec<Commodity>, checkpoint: Option<&str>) -> Vec<Commodity> {
    commodities.sort_by(by_symbol);

    if let Some(last) = checkpoint {
        // Everything <= the checkpoint was visited in the current lap.
        let resume_at = commodities.partition_point(|c| c.symbol.as_str() <= last);
        commodities.rotate_left(resume_at);
    }

    commodities
}
