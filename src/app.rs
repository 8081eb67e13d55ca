//! One price-update run against a ledger file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{error, info};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::clock::Clock;
use crate::error::UpdateError;
use crate::ledger::{is_locked, lock_path, Ledger};
use crate::models::Commodity;
use crate::quotes::{QuoteFetcher, QuoteSources, RetryPolicy};
use crate::refresh::{order_commodities, select_commodities, PriceUpdater};

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub ledger_path: PathBuf,
    pub sources: QuoteSources,
    pub retry: RetryPolicy,
}

impl UpdateOptions {
    pub fn new(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            sources: QuoteSources::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_sources(mut self, sources: QuoteSources) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Checkpoint the run resumed after, if any.
    pub resumed_after: Option<String>,
    /// Symbols in the order they were (or would have been) visited.
    pub ordered: Vec<String>,
    pub priced: Vec<String>,
    /// Checkpoint written at the end of the run.
    pub last_symbol: Option<String>,
    pub stopped_at: Option<String>,
}

/// Ordered commodities for the next run, without fetching anything.
pub async fn plan(
    ledger_path: &Path,
    checkpoints: &dyn CheckpointStore,
) -> Result<(Option<String>, Vec<Commodity>), UpdateError> {
    let ledger_path = check_exists(ledger_path)?;
    let ledger = Ledger::load(&ledger_path).await?;
    let selected = select_commodities(&ledger)?;
    let resume_after = checkpoints.get(&ledger_path).await?.map(|c| c.last_symbol);
    let ordered = order_commodities(selected, resume_after.as_deref());
    Ok((resume_after, ordered))
}

/// Fetch prices for the ledger's holdings, resuming from the last checkpoint.
///
/// The ledger and checkpoint are only written when at least one price was
/// recorded.
pub async fn update_prices(
    options: &UpdateOptions,
    fetcher: &dyn QuoteFetcher,
    checkpoints: &dyn CheckpointStore,
    clock: &dyn Clock,
) -> Result<RunSummary, UpdateError> {
    let ledger_path = check_exists(&options.ledger_path)?;
    if is_locked(&ledger_path) {
        let lock = lock_path(&ledger_path);
        error!(lock = %lock.display(), "lockfile exists, cannot proceed");
        return Err(UpdateError::Locked(lock));
    }

    let mut ledger = Ledger::load(&ledger_path).await?;
    let selected = select_commodities(&ledger)?;
    if selected.is_empty() {
        info!(ledger = %ledger_path.display(), "no commodities to price");
        return Ok(RunSummary::default());
    }

    let resumed_after = checkpoints
        .get(&ledger_path)
        .await?
        .map(|c| c.last_symbol);
    let ordered = order_commodities(selected, resumed_after.as_deref());
    info!(
        ledger = %ledger_path.display(),
        commodities = ordered.len(),
        resume_after = resumed_after.as_deref().unwrap_or("<start>"),
        "updating prices"
    );

    let updater = PriceUpdater::new(fetcher, &options.sources, options.retry.clone(), clock);
    let report = updater.run(&ordered, &mut ledger).await?;

    let mut summary = RunSummary {
        resumed_after,
        ordered: ordered.iter().map(|c| c.symbol.clone()).collect(),
        priced: report.priced.clone(),
        last_symbol: None,
        stopped_at: report.stopped_at.clone(),
    };

    if report.attempted.is_empty() {
        info!(ledger = %ledger_path.display(), "no commodity has a quote source");
        return Ok(summary);
    }

    let Some(last) = report.last_success() else {
        error!(
            ledger = %ledger_path.display(),
            attempted = report.attempted.len(),
            "no prices fetched"
        );
        return Err(UpdateError::NoPricesFetched {
            attempted: report.attempted.len(),
        });
    };

    ledger
        .save(&ledger_path)
        .await
        .context("Failed to save ledger with new prices")?;
    checkpoints
        .put(&ledger_path, &Checkpoint::new(last, clock.now()))
        .await
        .context("Failed to write checkpoint")?;

    info!(
        priced = report.priced.len(),
        last_symbol = last,
        stopped_at = report.stopped_at.as_deref().unwrap_or(""),
        "price update finished"
    );
    summary.last_symbol = Some(last.to_string());
    Ok(summary)
}

fn check_exists(path: &Path) -> Result<PathBuf, UpdateError> {
    if !path.exists() {
        error!(path = %path.display(), "ledger file doesn't exist");
        return Err(UpdateError::LedgerNotFound(path.to_path_buf()));
    }
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve ledger path {}", path.display()))?;
    Ok(canonical)
}
