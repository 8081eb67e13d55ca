use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::{ledger_key, Checkpoint, CheckpointStore};

/// Checkpoints kept in a single JSON document:
///
/// ```text
/// {
///   "ledgers": {
///     "/home/me/books/home.json": {"last_symbol": "TSLA", "updated_at": "..."}
///   }
/// }
/// ```
pub struct JsonCheckpointStore {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(default)]
    ledgers: BTreeMap<String, Checkpoint>,
}

impl JsonCheckpointStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<data dir>/ledger-quotes/checkpoints.json`, falling back to the
    /// working directory when no data dir is known.
    pub fn default_path() -> PathBuf {
        match dirs::data_dir() {
            Some(dir) => dir.join("ledger-quotes").join("checkpoints.json"),
            None => PathBuf::from("ledger-quotes-checkpoints.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<CheckpointFile> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(CheckpointFile::default()),
            Ok(content) => serde_json::from_str(&content).with_context(|| {
                format!("Failed to parse checkpoint file {}", self.path.display())
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CheckpointFile::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read checkpoint file {}", self.path.display())),
        }
    }

    async fn write_file(&self, file: &CheckpointFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create checkpoint directory")?;
            }
        }

        let content =
            serde_json::to_string_pretty(file).context("Failed to serialize checkpoints")?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CheckpointStore for JsonCheckpointStore {
    async fn get(&self, ledger: &Path) -> Result<Option<Checkpoint>> {
        let file = self.read_file().await?;
        Ok(file.ledgers.get(&ledger_key(ledger)).cloned())
    }

    async fn put(&self, ledger: &Path, checkpoint: &Checkpoint) -> Result<()> {
        let mut file = self.read_file().await?;
        file.ledgers.insert(ledger_key(ledger), checkpoint.clone());
        self.write_file(&file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_has_no_checkpoints() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonCheckpointStore::new(dir.path().join("state.json"));
        assert_eq!(store.get(Path::new("/books/a.json")).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonCheckpointStore::new(dir.path().join("nested").join("state.json"));
        let ledger = Path::new("/books/home ledger.json");

        store.put(ledger, &Checkpoint::new("XYZ", at(9))).await?;

        let reopened = JsonCheckpointStore::new(store.path());
        let checkpoint = reopened.get(ledger).await?.expect("checkpoint");
        assert_eq!(checkpoint.last_symbol, "XYZ");
        assert_eq!(checkpoint.updated_at, at(9));
        assert_eq!(reopened.get(Path::new("/books/other.json")).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_ledgers_are_tracked_independently() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonCheckpointStore::new(dir.path().join("state.json"));
        let home = Path::new("/books/home.json");
        let work = Path::new("/books/work.json");

        store.put(home, &Checkpoint::new("AAPL", at(1))).await?;
        store.put(work, &Checkpoint::new("VTSAX", at(2))).await?;
        store.put(home, &Checkpoint::new("TSLA", at(3))).await?;

        assert_eq!(store.get(home).await?.map(|c| c.last_symbol), Some("TSLA".to_string()));
        assert_eq!(store.get(work).await?.map(|c| c.last_symbol), Some("VTSAX".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json")?;
        let store = JsonCheckpointStore::new(&path);
        assert!(store.get(Path::new("/books/a.json")).await.is_err());
        Ok(())
    }
}
