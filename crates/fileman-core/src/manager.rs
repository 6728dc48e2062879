/// `FileManager` — the façade tying scans, planners, the executor, and the
/// history ledger together.
///
/// Every operation follows the same two-mode contract: with `apply =
/// false` it returns the full planned action list and touches nothing;
/// with `apply = true` it applies that plan and records the succeeded
/// actions as an undoable history batch. Preview and apply run the same
/// planner over the same scan, so an apply performs exactly what the
/// preview showed (modulo concurrent filesystem changes, which surface as
/// per-action failures).
use crate::error::Result;
use crate::executor;
use crate::hasher::{find_dupes, HashAlgorithm};
use crate::history::{HistoryBatch, HistoryLedger};
use crate::model::{DupesSummary, ExecutionResult, FileAction, IndexSummary, PreviewResult};
use crate::planner::{
    plan_clean, plan_dedupe, plan_organize, plan_rename, CleanPolicy, DedupePolicy,
    OrganizePolicy, RenamePolicy,
};
use crate::scanner::{self, scan_collect, ScanOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// What an operation produced, depending on the requested mode.
#[derive(Debug, Clone)]
pub enum OperationOutcome {
    /// `apply = false`: the planned actions, disk untouched.
    Preview(PreviewResult),
    /// `apply = true`: what was applied and what failed.
    Applied(ExecutionResult),
}

impl OperationOutcome {
    /// The planned or applied actions, whichever mode ran.
    pub fn actions(&self) -> &[FileAction] {
        match self {
            OperationOutcome::Preview(preview) => &preview.actions,
            OperationOutcome::Applied(result) => &result.succeeded,
        }
    }
}

pub struct FileManager {
    history: HistoryLedger,
}

impl FileManager {
    /// Open a manager whose undo ledger lives at `history_path`.
    pub fn open(history_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            history: HistoryLedger::load(history_path)?,
        })
    }

    /// Bucket files under `root` into folders by extension or date.
    pub fn organize(
        &self,
        root: &Path,
        options: &ScanOptions,
        policy: &OrganizePolicy,
        apply: bool,
    ) -> Result<OperationOutcome> {
        let scan = scan_collect(root, options)?;
        self.run("organize", plan_organize(&scan, policy)?, apply)
    }

    /// Bulk-rename files under `root` according to the policy transforms.
    /// Invalid policies are rejected before any scan work begins.
    pub fn rename(
        &self,
        root: &Path,
        options: &ScanOptions,
        policy: &RenamePolicy,
        apply: bool,
    ) -> Result<OperationOutcome> {
        policy.validate()?;
        let scan = scan_collect(root, options)?;
        self.run("rename", plan_rename(&scan, policy)?, apply)
    }

    /// Archive, trash, or delete files under `root` by age and size.
    pub fn clean(
        &self,
        root: &Path,
        options: &ScanOptions,
        policy: &CleanPolicy,
        apply: bool,
    ) -> Result<OperationOutcome> {
        policy.validate()?;
        let scan = scan_collect(root, options)?;
        self.run("clean", plan_clean(&scan, policy)?, apply)
    }

    /// Find content duplicates under `root` and dispose of them per policy.
    pub fn dedupe(
        &self,
        root: &Path,
        options: &ScanOptions,
        policy: &DedupePolicy,
        apply: bool,
    ) -> Result<OperationOutcome> {
        let scan = scan_collect(root, options)?;
        self.run("dedupe", plan_dedupe(&scan, policy)?, apply)
    }

    /// Build a file inventory of `root`, blocking until done.
    pub fn index(
        &self,
        root: &Path,
        options: &ScanOptions,
        algo: Option<HashAlgorithm>,
    ) -> Result<IndexSummary> {
        scanner::index(root, options, algo)
    }

    /// Summarize duplicate groups under `root`, blocking until done.
    pub fn dupes(
        &self,
        root: &Path,
        options: &ScanOptions,
        algo: HashAlgorithm,
    ) -> Result<DupesSummary> {
        find_dupes(root, options, algo)
    }

    /// All recorded undo batches, oldest first.
    pub fn history(&self) -> Vec<HistoryBatch> {
        self.history.batches()
    }

    /// The inverse actions undoing batch `index` would apply.
    pub fn preview_undo(&self, index: u64) -> Result<Vec<FileAction>> {
        self.history.preview_undo(index)
    }

    /// Undo batch `index`; validate only unless `apply`.
    pub fn undo(&self, index: u64, apply: bool) -> Result<ExecutionResult> {
        self.history.undo(index, apply)
    }

    /// Drop every recorded batch; returns how many were removed.
    pub fn clear_history(&self) -> Result<usize> {
        self.history.clear()
    }

    fn run(&self, op: &str, mut preview: PreviewResult, apply: bool) -> Result<OperationOutcome> {
        if !apply {
            info!(op, actions = preview.actions.len(), "preview");
            preview.message = Some(format!("Preview: {} actions", preview.actions.len()));
            return Ok(OperationOutcome::Preview(preview));
        }
        let result = executor::execute(&preview.actions, true);
        info!(
            op,
            applied = result.succeeded.len(),
            failed = result.failed.len(),
            "applied"
        );
        self.history.push(result.succeeded.clone())?;
        Ok(OperationOutcome::Applied(result))
    }
}
