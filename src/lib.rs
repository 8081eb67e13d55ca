pub mod app;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod ledger;
#[cfg(feature = "cli")]
pub mod logging;
pub mod models;
pub mod quotes;
pub mod refresh;
