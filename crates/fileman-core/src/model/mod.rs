/// Data model shared by the scanner, planners, executor, and history ledger.
pub mod action;
pub mod preview;

pub use action::{FileAction, FileOp, META_KEPT, META_REASON, META_RESTORE};
pub use preview::{
    DupeGroup, DupesSummary, ExecutionResult, FailedAction, FileEntry, IndexEntry, IndexSummary,
    PreviewResult, ScanOutcome,
};
