/// Executor — applies a planned action list to the filesystem.
///
/// Actions are applied strictly in the order given; planners are
/// responsible for emitting an order that is safe sequentially. A failure
/// on one action never aborts the batch: it is recorded in
/// [`ExecutionResult::failed`] and execution continues. Only `succeeded`
/// actions are eligible for the history ledger.
///
/// With `apply = false` this is a pure validation pass — existence and
/// occupancy checks only, no mutation — and a clean pass returns the
/// planned list unchanged.
use crate::model::{ExecutionResult, FailedAction, FileAction, FileOp, META_REASON};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Why an action could not be applied. The distinction matters to the
/// history ledger: retryable failures stay in their batch, permanent ones
/// can never succeed and must drain out.
pub(crate) enum ActionFailure {
    /// Retrying later may succeed (occupied destination, transient IO).
    Retryable(String),
    /// No retry can ever succeed (entry gone, data destroyed).
    Permanent(String),
}

impl ActionFailure {
    pub(crate) fn into_message(self) -> String {
        match self {
            ActionFailure::Retryable(message) | ActionFailure::Permanent(message) => message,
        }
    }
}

fn retryable(err: impl std::fmt::Display) -> ActionFailure {
    ActionFailure::Retryable(err.to_string())
}

/// Apply or validate `actions` in order.
pub fn execute(actions: &[FileAction], apply: bool) -> ExecutionResult {
    let mut result = ExecutionResult::default();
    for action in actions {
        let outcome = if apply {
            apply_action(action).map_err(ActionFailure::into_message)
        } else {
            validate_action(action)
        };
        match outcome {
            Ok(()) => {
                debug!(?action.op, src = %action.src.display(), applied = apply, "action ok");
                result.succeeded.push(action.clone());
            }
            Err(error) => {
                warn!(
                    ?action.op,
                    src = %action.src.display(),
                    "action failed: {error}"
                );
                result.failed.push(FailedAction {
                    action: action.clone(),
                    error,
                });
            }
        }
    }
    result
}

/// Check an action without mutating anything.
fn validate_action(action: &FileAction) -> Result<(), String> {
    match action.op {
        FileOp::Move | FileOp::Rename => {
            let dst = destination(action)?;
            if action.is_trash_restore() {
                // Source lives in the trash; only the landing spot matters.
                if dst.exists() {
                    return Err(format!("destination already exists: {}", dst.display()));
                }
                return Ok(());
            }
            require_exists(&action.src)?;
            if dst.exists() && dst != action.src.as_path() {
                return Err(format!("destination already exists: {}", dst.display()));
            }
            Ok(())
        }
        FileOp::Delete | FileOp::Trash => require_exists(&action.src),
        FileOp::RemoveDir => {
            if !action.src.is_dir() {
                return Err(format!("not a directory: {}", action.src.display()));
            }
            Ok(())
        }
        FileOp::CreateDir | FileOp::Duplicate => Ok(()),
        FileOp::UndoFailed => Err(undo_failed_reason(action)),
    }
}

/// Apply a single action to the filesystem. Shared with the ledger's undo
/// path, which needs per-action outcomes to track what was reversed.
pub(crate) fn apply_action(action: &FileAction) -> Result<(), ActionFailure> {
    match action.op {
        FileOp::Move | FileOp::Rename => {
            let dst = destination(action).map_err(ActionFailure::Permanent)?;
            if action.is_trash_restore() {
                return restore_from_trash(dst);
            }
            if dst.exists() {
                return Err(ActionFailure::Retryable(format!(
                    "destination already exists: {}",
                    dst.display()
                )));
            }
            if let Some(parent) = dst.parent() {
                // Implicit and idempotent: an existing directory is fine.
                fs::create_dir_all(parent).map_err(retryable)?;
            }
            move_path(&action.src, dst).map_err(ActionFailure::Retryable)
        }
        FileOp::Delete => fs::remove_file(&action.src).map_err(retryable),
        FileOp::Trash => trash::delete(&action.src).map_err(retryable),
        FileOp::Duplicate => Ok(()), // informational only
        FileOp::CreateDir => fs::create_dir_all(&action.src).map_err(retryable),
        // remove_dir (not _all): refuses a directory that still has
        // content the planner did not know about.
        FileOp::RemoveDir => fs::remove_dir(&action.src).map_err(retryable),
        FileOp::UndoFailed => Err(ActionFailure::Permanent(undo_failed_reason(action))),
    }
}

fn destination(action: &FileAction) -> Result<&Path, String> {
    action
        .dst
        .as_deref()
        .ok_or_else(|| format!("{:?} action has no destination", action.op))
}

fn require_exists(path: &Path) -> Result<(), String> {
    if path.symlink_metadata().is_ok() {
        Ok(())
    } else {
        Err(format!("source does not exist: {}", path.display()))
    }
}

fn undo_failed_reason(action: &FileAction) -> String {
    action
        .meta
        .get(META_REASON)
        .cloned()
        .unwrap_or_else(|| "action cannot be undone".to_string())
}

/// Rename, falling back to copy-and-remove when the destination is on a
/// different filesystem.
fn move_path(src: &Path, dst: &Path) -> Result<(), String> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if src.is_file() {
                fs::copy(src, dst).map_err(|e| e.to_string())?;
                fs::remove_file(src).map_err(|e| e.to_string())?;
                Ok(())
            } else {
                Err(rename_err.to_string())
            }
        }
    }
}

/// Move a file back out of the OS trash to `original`.
///
/// Only Windows and Freedesktop platforms expose trash enumeration;
/// elsewhere the entry can only be recovered manually. A missing trash
/// entry is a permanent failure: the entry will never reappear, so
/// retrying is pointless.
#[cfg(any(
    target_os = "windows",
    all(
        unix,
        not(any(target_os = "macos", target_os = "ios", target_os = "android"))
    )
))]
fn restore_from_trash(original: &Path) -> Result<(), ActionFailure> {
    use trash::os_limited;

    let items = os_limited::list().map_err(retryable)?;
    let item = items
        .into_iter()
        .filter(|item| item.original_path() == original)
        // Newest entry wins if the same path was trashed repeatedly.
        .max_by_key(|item| item.time_deleted)
        .ok_or_else(|| {
            ActionFailure::Permanent(format!("no trash entry for {}", original.display()))
        })?;
    os_limited::restore_all([item]).map_err(retryable)
}

#[cfg(not(any(
    target_os = "windows",
    all(
        unix,
        not(any(target_os = "macos", target_os = "ios", target_os = "android"))
    )
)))]
fn restore_from_trash(original: &Path) -> Result<(), ActionFailure> {
    Err(ActionFailure::Permanent(format!(
        "restoring {} from the trash is not supported on this platform",
        original.display()
    )))
}
