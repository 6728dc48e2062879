/// Action planners — one pure function per operation kind.
///
/// Every planner consumes a collected [`ScanOutcome`](crate::model::ScanOutcome)
/// plus an operation policy and produces an ordered [`PreviewResult`]
/// without mutating anything. Policies are validated before any scan work;
/// planning twice against an unchanged filesystem yields identical output.
///
/// Planners emit actions in an order safe for strictly sequential
/// application: moves and renames first, in sorted scan order, then
/// `RemoveDir` actions deepest-first so a parent's emptiness is evaluated
/// after its children's planned removals.
pub mod clean;
pub mod dedupe;
pub mod organize;
pub mod rename;

pub use clean::{plan_clean, CleanPolicy, Disposal};
pub use dedupe::{plan_dedupe, DedupePolicy, DedupeTarget};
pub use organize::{plan_organize, OrganizeBy, OrganizePolicy};
pub use rename::{plan_rename, RenamePolicy};

use crate::model::{FileAction, ScanOutcome};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Resolve `desired` against both the set of destinations already claimed
/// by this plan and the filesystem, appending `-N` to the stem until free.
///
/// The in-progress `taken` set matters because multiple planned actions
/// can collide with each other long before anything touches disk. The
/// existence check is deliberately conservative: a destination occupied by
/// a file that is itself being moved away still gets a suffix, which keeps
/// every emitted order safe for sequential application.
pub(crate) fn unique_destination(desired: PathBuf, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let mut candidate = desired.clone();
    let mut n = 1u32;
    while taken.contains(&candidate) || candidate.exists() {
        candidate = numbered_sibling(&desired, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// `dir/stem-N.ext` for collision resolution.
fn numbered_sibling(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!("{stem}-{n}{ext}"))
}

/// Plan `RemoveDir` actions for directories that would be empty once every
/// file reaches the location in `final_locations` (moved files appear at
/// their destination, deleted and trashed files not at all).
///
/// Directories are evaluated deepest-first; a directory counts as empty
/// when no final file location lies under it and every scanned child
/// directory is itself planned for removal. Directories pruned from the
/// scan by an exclude pattern are invisible here — if one still holds
/// content, the executor's `RemoveDir` refuses it and the failure is
/// recorded per-action rather than breaking the batch.
pub(crate) fn plan_remove_empty(
    scan: &ScanOutcome,
    final_locations: &HashSet<PathBuf>,
) -> Vec<FileAction> {
    let mut dirs: Vec<&PathBuf> = scan.dirs.iter().collect();
    dirs.sort_by_key(|d| (std::cmp::Reverse(d.components().count()), d.as_path()));

    let mut removed: HashSet<&Path> = HashSet::new();
    let mut actions = Vec::new();
    for dir in dirs {
        let holds_file = final_locations.iter().any(|p| p.starts_with(dir));
        let holds_kept_subdir = scan
            .dirs
            .iter()
            .any(|d| d.parent() == Some(dir) && !removed.contains(d.as_path()));
        if !holds_file && !holds_kept_subdir {
            removed.insert(dir.as_path());
            actions.push(FileAction::remove_dir(dir));
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileOp, ScanOutcome};
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn unique_destination_counts_up_past_collisions() {
        let tmp = TempDir::new().unwrap();
        let mut taken = HashSet::new();

        let first = unique_destination(tmp.path().join("a_renamed.txt"), &mut taken);
        assert!(first.ends_with("a_renamed.txt"));

        // Second plan entry wanting the same destination gets -1.
        let second = unique_destination(tmp.path().join("a_renamed.txt"), &mut taken);
        assert!(second.ends_with("a_renamed-1.txt"), "got {second:?}");

        let third = unique_destination(tmp.path().join("a_renamed.txt"), &mut taken);
        assert!(third.ends_with("a_renamed-2.txt"), "got {third:?}");
    }

    #[test]
    fn unique_destination_avoids_existing_files() {
        let tmp = TempDir::new().unwrap();
        File::create(tmp.path().join("report.txt")).unwrap();

        let mut taken = HashSet::new();
        let resolved = unique_destination(tmp.path().join("report.txt"), &mut taken);
        assert!(resolved.ends_with("report-1.txt"), "got {resolved:?}");
    }

    #[test]
    fn remove_empty_is_bottom_up_and_respects_remaining_files() {
        let root = PathBuf::from("/scan");
        let scan = ScanOutcome {
            root: root.clone(),
            files: Vec::new(),
            dirs: vec![
                root.join("a"),
                root.join("a/deep"),
                root.join("busy"),
            ],
            warnings: 0,
        };
        // One file stays behind in /scan/busy; everything else empties out.
        let final_locations: HashSet<PathBuf> = [root.join("busy/kept.txt")].into();

        let actions = plan_remove_empty(&scan, &final_locations);
        let targets: Vec<&Path> = actions.iter().map(|a| a.src.as_path()).collect();
        assert_eq!(targets, vec![root.join("a/deep").as_path(), root.join("a").as_path()]);
        assert!(actions.iter().all(|a| a.op == FileOp::RemoveDir));
    }

    #[test]
    fn parent_with_kept_child_dir_is_not_removed() {
        let root = PathBuf::from("/scan");
        let scan = ScanOutcome {
            root: root.clone(),
            files: Vec::new(),
            dirs: vec![root.join("a"), root.join("a/full")],
            warnings: 0,
        };
        let final_locations: HashSet<PathBuf> = [root.join("a/full/data.bin")].into();

        let actions = plan_remove_empty(&scan, &final_locations);
        assert!(actions.is_empty(), "nothing can be removed: {actions:?}");
    }
}
