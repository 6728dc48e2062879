/// Deduplicate planner — turn duplicate groups into disposal actions.
use crate::error::Result;
use crate::hasher::{index::group_by_hash, HashAlgorithm};
use crate::model::{FileAction, PreviewResult, ScanOutcome, META_KEPT};
use crate::planner::unique_destination;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// What to do with each duplicate. The kept file is never targeted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupeTarget {
    /// Emit informational `Duplicate` markers only.
    #[default]
    List,
    Trash,
    /// Permanent deletion — flagged destructive in the preview.
    Delete,
    /// Move duplicates into this directory instead of disposing of them.
    Archive(PathBuf),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupePolicy {
    pub algo: HashAlgorithm,
    pub target: DedupeTarget,
}

/// Group scanned files by content and plan one action per duplicate path.
///
/// Hashing reads file contents but mutates nothing; over an unchanged
/// tree the grouping and the resulting plan are identical between calls.
pub fn plan_dedupe(scan: &ScanOutcome, policy: &DedupePolicy) -> Result<PreviewResult> {
    let groups = group_by_hash(&scan.files, policy.algo);

    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut actions = Vec::new();
    let mut wasted_bytes = 0u64;

    for group in &groups {
        wasted_bytes += group.wasted_bytes;
        let kept = group.keep.to_string_lossy().into_owned();
        for dupe in &group.duplicates {
            let action = match &policy.target {
                DedupeTarget::List => FileAction::duplicate_of(dupe, &group.keep),
                DedupeTarget::Trash => FileAction::trash(dupe).with_meta(META_KEPT, kept.clone()),
                DedupeTarget::Delete => FileAction::delete(dupe).with_meta(META_KEPT, kept.clone()),
                DedupeTarget::Archive(dir) => {
                    let name = dupe.file_name().unwrap_or_default();
                    let dst = unique_destination(dir.join(name), &mut taken);
                    FileAction::move_to(dupe, dst).with_meta(META_KEPT, kept.clone())
                }
            };
            actions.push(action);
        }
    }

    Ok(PreviewResult {
        actions,
        files_scanned: scan.files.len(),
        total_size_bytes: wasted_bytes,
        message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileOp;
    use crate::scanner::{scan_collect, ScanOptions};
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().write_all(contents).unwrap();
    }

    fn scan(root: &Path) -> ScanOutcome {
        scan_collect(root, &ScanOptions::default()).unwrap()
    }

    #[test]
    fn list_mode_emits_duplicate_markers_never_for_keep() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("a.txt"), b"same");
        write_file(&tmp.path().join("a copy.txt"), b"same");
        write_file(&tmp.path().join("third a.txt"), b"same");

        let preview = plan_dedupe(&scan(tmp.path()), &DedupePolicy::default()).unwrap();
        assert_eq!(preview.actions.len(), 2, "two duplicates, one kept");
        let keep = tmp.path().join("a.txt");
        for action in &preview.actions {
            assert_eq!(action.op, FileOp::Duplicate);
            assert_ne!(action.src, keep);
            assert_eq!(
                action.meta.get(META_KEPT).unwrap(),
                &keep.to_string_lossy().into_owned()
            );
        }
        assert_eq!(preview.total_size_bytes, 8);
    }

    #[test]
    fn trash_target_emits_trash_actions_with_kept_meta() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("x.bin"), b"dd");
        write_file(&tmp.path().join("y copy.bin"), b"dd");

        let policy = DedupePolicy {
            target: DedupeTarget::Trash,
            ..Default::default()
        };
        let preview = plan_dedupe(&scan(tmp.path()), &policy).unwrap();
        assert_eq!(preview.actions.len(), 1);
        assert_eq!(preview.actions[0].op, FileOp::Trash);
        assert!(preview.actions[0].meta.contains_key(META_KEPT));
        assert!(!preview.has_destructive_actions());
    }

    #[test]
    fn delete_target_is_destructive() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("p.dat"), b"zz");
        write_file(&tmp.path().join("q.dat"), b"zz");

        let policy = DedupePolicy {
            target: DedupeTarget::Delete,
            ..Default::default()
        };
        let preview = plan_dedupe(&scan(tmp.path()), &policy).unwrap();
        assert!(preview.has_destructive_actions());
    }

    #[test]
    fn archive_target_moves_duplicates_collision_free() {
        let tmp = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        write_file(&tmp.path().join("one/same.txt"), b"c");
        write_file(&tmp.path().join("two/same.txt"), b"c");
        write_file(&tmp.path().join("same.txt"), b"c");

        let policy = DedupePolicy {
            target: DedupeTarget::Archive(archive.path().to_path_buf()),
            ..Default::default()
        };
        let preview = plan_dedupe(&scan(tmp.path()), &policy).unwrap();
        // Shortest path (root same.txt) is kept; the two nested copies move.
        assert_eq!(preview.actions.len(), 2);
        let dsts: Vec<_> = preview
            .actions
            .iter()
            .map(|a| a.dst.clone().unwrap())
            .collect();
        assert_eq!(dsts[0], archive.path().join("same.txt"));
        assert_eq!(dsts[1], archive.path().join("same-1.txt"));
    }

    #[test]
    fn no_duplicates_means_empty_plan() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("a.txt"), b"one");
        write_file(&tmp.path().join("b.txt"), b"two two");

        let preview = plan_dedupe(&scan(tmp.path()), &DedupePolicy::default()).unwrap();
        assert!(preview.actions.is_empty());
        assert_eq!(preview.files_scanned, 2);
    }
}
