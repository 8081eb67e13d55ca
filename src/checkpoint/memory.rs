use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tokio::sync::Mutex;

use super::{ledger_key, Checkpoint, CheckpointStore};

/// In-memory checkpoint store for tests and dry runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    entries: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self, ledger: &Path) -> Result<Option<Checkpoint>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&ledger_key(ledger)).cloned())
    }

    async fn put(&self, ledger: &Path, checkpoint: &Checkpoint) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(ledger_key(ledger), checkpoint.clone());
        Ok(())
    }
}
