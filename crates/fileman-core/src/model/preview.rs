/// Result types produced by scans, planners, the executor, and the
/// duplicate index.
use crate::model::FileAction;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// One file visited by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    /// Missing when the platform does not report mtimes for this entry.
    pub modified: Option<SystemTime>,
}

/// A fully collected scan — input to every planner.
///
/// `files` is sorted by path so planning over an unchanged tree is
/// deterministic regardless of directory-entry order. `dirs` lists every
/// directory the walk descended into (excluding the root), needed for
/// remove-empty planning.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub root: PathBuf,
    pub files: Vec<FileEntry>,
    pub dirs: Vec<PathBuf>,
    /// Entries skipped with a logged warning (permission denied, vanished
    /// file, symlink cycle). Never fails the scan.
    pub warnings: u64,
}

/// Dry-run output of a planner. Never touches disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub actions: Vec<FileAction>,
    pub files_scanned: usize,
    pub total_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PreviewResult {
    /// Whether any planned action destroys data with no recovery path.
    /// Callers must be able to warn before requesting `apply=true`.
    pub fn has_destructive_actions(&self) -> bool {
        self.actions.iter().any(FileAction::is_destructive)
    }
}

/// An action that could not be applied, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAction {
    pub action: FileAction,
    pub error: String,
}

/// Outcome of applying (or validating) a planned action list.
///
/// A failure on one action never aborts the batch; only `succeeded`
/// actions are eligible for the history ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub succeeded: Vec<FileAction>,
    pub failed: Vec<FailedAction>,
}

/// A set of files sharing identical content.
///
/// Invariants: every path in `duplicates` has the same `(hash, size)` as
/// `keep`, and `count >= 2`. `keep` is the shortest path in the group,
/// ties broken lexicographically, so membership is reproducible across
/// runs regardless of traversal or hash-completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DupeGroup {
    pub hash: String,
    pub hash_algo: String,
    pub size_bytes: u64,
    pub count: usize,
    pub keep: PathBuf,
    pub duplicates: Vec<PathBuf>,
    pub wasted_bytes: u64,
}

/// Aggregate result of a duplicate scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DupesSummary {
    pub groups: Vec<DupeGroup>,
    pub total_groups: usize,
    pub total_duplicates: usize,
    pub total_wasted_bytes: u64,
}

impl DupesSummary {
    pub fn from_groups(groups: Vec<DupeGroup>) -> Self {
        let total_groups = groups.len();
        let total_duplicates = groups.iter().map(|g| g.count - 1).sum();
        let total_wasted_bytes = groups.iter().map(|g| g.wasted_bytes).sum();
        Self {
            groups,
            total_groups,
            total_duplicates,
            total_wasted_bytes,
        }
    }
}

/// One row of a file inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub mtime_epoch: i64,
    /// Present only when the index was requested with hashing enabled;
    /// `None` for files that could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Aggregate result of an index scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub files: Vec<IndexEntry>,
    pub total_files: usize,
    pub total_size_bytes: u64,
}
