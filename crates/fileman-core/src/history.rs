/// History ledger — persistent undo batches.
///
/// Every applied operation pushes its succeeded actions as one batch.
/// Batches carry stable indices: undoing or clearing never renumbers the
/// survivors, so an index shown to the user stays valid until its batch
/// is gone. The ledger is a plain JSON file, rewritten atomically
/// (temp file then rename) after every mutation.
use crate::error::{Error, Result};
use crate::executor;
use crate::model::{ExecutionResult, FailedAction, FileAction, FileOp};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One applied operation, as recorded for undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryBatch {
    pub index: u64,
    pub actions: Vec<FileAction>,
    pub timestamp: DateTime<Utc>,
    /// Set once an undo attempt reversed some but not all of the batch.
    #[serde(default)]
    pub partial: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    next_index: u64,
    batches: Vec<HistoryBatch>,
}

/// The undo ledger backing a [`crate::manager::FileManager`].
///
/// The storage path is injected at construction; nothing here assumes a
/// global location, so tests and embedders point it wherever they like.
pub struct HistoryLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl HistoryLedger {
    /// Open the ledger at `path`, creating an empty one if the file does
    /// not exist yet. A present-but-unreadable file is an error: silently
    /// starting over would orphan every recorded batch.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| Error::HistoryStore(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerState {
                next_index: 1,
                batches: Vec::new(),
            },
            Err(e) => return Err(Error::HistoryStore(format!("{}: {e}", path.display()))),
        };
        debug!(path = %path.display(), batches = state.batches.len(), "history loaded");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Record one applied operation's succeeded actions. Empty batches are
    /// not recorded; returns the new batch index otherwise.
    pub fn push(&self, actions: Vec<FileAction>) -> Result<Option<u64>> {
        if actions.is_empty() {
            return Ok(None);
        }
        let mut state = self.state.lock();
        let index = state.next_index;
        state.next_index += 1;
        state.batches.push(HistoryBatch {
            index,
            actions,
            timestamp: Utc::now(),
            partial: false,
        });
        self.persist(&state)?;
        info!(index, "history batch recorded");
        Ok(Some(index))
    }

    /// All recorded batches, oldest first.
    pub fn batches(&self) -> Vec<HistoryBatch> {
        self.state.lock().batches.clone()
    }

    /// The inverse actions that undoing `index` would apply, newest action
    /// first. Pure computation; the ledger is not modified.
    pub fn preview_undo(&self, index: u64) -> Result<Vec<FileAction>> {
        let state = self.state.lock();
        let batch = state
            .batches
            .iter()
            .find(|b| b.index == index)
            .ok_or(Error::BatchNotFound(index))?;
        let inverses: Vec<FileAction> = batch
            .actions
            .iter()
            .rev()
            .filter_map(inverse)
            .collect();
        if inverses.is_empty() {
            return Err(Error::NothingToUndo(index));
        }
        Ok(inverses)
    }

    /// Undo batch `index`.
    ///
    /// With `apply = false` the inverse plan is only validated. With
    /// `apply = true` each inverse is applied in order; actions whose
    /// inverse succeeded (or can never succeed) leave the batch, and
    /// reversible actions whose inverse failed stay behind with the batch
    /// marked `partial` so a later retry can finish the job. The batch is
    /// removed once nothing undoable remains.
    pub fn undo(&self, index: u64, apply: bool) -> Result<ExecutionResult> {
        let mut state = self.state.lock();
        let position = state
            .batches
            .iter()
            .position(|b| b.index == index)
            .ok_or(Error::BatchNotFound(index))?;

        // (offset into batch.actions, inverse), newest action first.
        let plan: Vec<(usize, FileAction)> = state.batches[position]
            .actions
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(i, action)| inverse(action).map(|inv| (i, inv)))
            .collect();
        if plan.is_empty() {
            return Err(Error::NothingToUndo(index));
        }

        if !apply {
            let inverses: Vec<FileAction> = plan.into_iter().map(|(_, inv)| inv).collect();
            return Ok(executor::execute(&inverses, false));
        }

        let mut result = ExecutionResult::default();
        let mut reversed = Vec::new();
        for (offset, inv) in plan {
            match executor::apply_action(&inv) {
                Ok(()) => {
                    reversed.push(offset);
                    result.succeeded.push(inv);
                }
                Err(executor::ActionFailure::Retryable(error)) => {
                    warn!(index, "undo action failed: {error}");
                    result.failed.push(FailedAction { action: inv, error });
                }
                // No retry can ever reverse this action (deleted data,
                // vanished trash entry): surface an UndoFailed record and
                // drop it from the batch so the batch can drain.
                Err(executor::ActionFailure::Permanent(error)) => {
                    reversed.push(offset);
                    warn!(index, "undo action failed permanently: {error}");
                    result.failed.push(FailedAction {
                        action: FileAction::undo_failed(&inv.src, &error),
                        error,
                    });
                }
            }
        }

        let batch = &mut state.batches[position];
        let mut offset = 0usize;
        batch.actions.retain(|action| {
            let drop = reversed.contains(&offset) || inverse(action).is_none();
            offset += 1;
            !drop
        });
        if batch.actions.is_empty() {
            state.batches.remove(position);
            info!(index, "history batch fully undone");
        } else {
            batch.partial = true;
            info!(index, remaining = batch.actions.len(), "history batch partially undone");
        }
        self.persist(&state)?;
        Ok(result)
    }

    /// Drop every recorded batch. Returns how many were removed. Indices
    /// are not reset; future batches continue the sequence.
    pub fn clear(&self) -> Result<usize> {
        let mut state = self.state.lock();
        let removed = state.batches.len();
        state.batches.clear();
        self.persist(&state)?;
        Ok(removed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &LedgerState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::HistoryStore(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::HistoryStore(format!("{}: {e}", parent.display())))?;
            }
        }
        // Write-then-rename keeps a crash from truncating the ledger.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| Error::HistoryStore(format!("{}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| Error::HistoryStore(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }
}

/// The action that reverses `action`, or `None` when there is nothing to
/// do (informational markers).
///
/// `Delete` inverts to an `UndoFailed` record: the failure is surfaced per
/// file rather than silently skipping what cannot come back.
fn inverse(action: &FileAction) -> Option<FileAction> {
    match action.op {
        FileOp::Move | FileOp::Rename => {
            let dst = action.dst.as_ref()?;
            let back = if action.op == FileOp::Move {
                FileAction::move_to(dst, &action.src)
            } else {
                FileAction::rename_to(dst, &action.src)
            };
            Some(back)
        }
        FileOp::Trash => Some(FileAction::restore_from_trash(&action.src)),
        FileOp::Delete => Some(FileAction::undo_failed(
            &action.src,
            "cannot restore a permanently deleted file",
        )),
        FileOp::CreateDir => Some(FileAction::remove_dir(&action.src)),
        FileOp::RemoveDir => Some(FileAction::create_dir(&action.src)),
        FileOp::Duplicate | FileOp::UndoFailed => None,
    }
}
