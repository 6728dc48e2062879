/// FileMan Core — file-action planning, execution, and undo.
///
/// This crate contains all business logic with zero UI dependencies.
/// It is designed to be reusable across different frontends (GUI, CLI,
/// TUI). Every operation runs as preview-by-default: planners produce an
/// ordered action list without touching disk, and only an explicit apply
/// executes it and records an undoable history batch.
///
/// # Modules
///
/// - [`model`] — Actions, previews, and the other shared data types.
/// - [`scanner`] — Prune-aware directory traversal and the index operation.
/// - [`hasher`] — Content digests and the two-stage duplicate index.
/// - [`planner`] — Pure planners for organize, rename, clean, and dedupe.
/// - [`executor`] — Sequential application of planned actions.
/// - [`history`] — The persistent undo ledger.
/// - [`progress`] — Cancellable background tasks with streamed progress.
/// - [`manager`] — The [`FileManager`](manager::FileManager) façade.
pub mod error;
pub mod executor;
pub mod hasher;
pub mod history;
pub mod manager;
pub mod model;
pub mod planner;
pub mod progress;
pub mod scanner;

pub use error::{Error, Result};
pub use manager::{FileManager, OperationOutcome};
