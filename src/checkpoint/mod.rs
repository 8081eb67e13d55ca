//! Per-ledger progress markers that survive process exit.

mod json_file;
mod memory;

pub use json_file::JsonCheckpointStore;
pub use memory::MemoryCheckpointStore;

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last commodity successfully priced for one ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_symbol: String,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(last_symbol: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            last_symbol: last_symbol.into(),
            updated_at,
        }
    }
}

/// Keyed by the ledger's absolute path, so one store can track many ledgers.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, ledger: &Path) -> Result<Option<Checkpoint>>;

    async fn put(&self, ledger: &Path, checkpoint: &Checkpoint) -> Result<()>;
}

pub(crate) fn ledger_key(ledger: &Path) -> String {
    ledger.to_string_lossy().into_owned()
}
