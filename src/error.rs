use std::path::PathBuf;

/// Why a price update run did not succeed.
///
/// The first two are precondition failures: they are reported before any
/// lookup happens and nothing is written.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("{} doesn't exist", .0.display())]
    LedgerNotFound(PathBuf),

    #[error("Lockfile {} exists, cannot proceed", .0.display())]
    Locked(PathBuf),

    #[error("No prices fetched ({attempted} commodities attempted)")]
    NoPricesFetched { attempted: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UpdateError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, UpdateError::LedgerNotFound(_) | UpdateError::Locked(_))
    }
}
