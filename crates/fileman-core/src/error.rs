/// Crate-wide error type.
///
/// Per-action execution and undo failures are *data*
/// ([`crate::model::ExecutionResult::failed`]), not errors — a batch always
/// commits whatever succeeded. This enum covers the failures that abort an
/// operation before any disk mutation (bad policies, bad patterns) and the
/// irrecoverable ones (unreadable history store).
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected before any scan work begins (e.g. `lower` and `upper`
    /// requested together, or a clean request with no filter).
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("invalid rename pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("no batch with index {0} in history")]
    BatchNotFound(u64),

    #[error("nothing to undo in batch {0}")]
    NothingToUndo(u64),

    /// The history store is unreadable or corrupt. Never silently
    /// dropped — undo correctness depends on exact reconstruction.
    #[error("history store error: {0}")]
    HistoryStore(String),
}

pub type Result<T> = std::result::Result<T, Error>;
