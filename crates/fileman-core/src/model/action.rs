/// A planned filesystem mutation and its closed operation set.
///
/// `FileAction` is immutable once constructed — planners build actions
/// through the constructors below and nothing ever rewrites one in place.
/// The executor and the ledger's inverse computation both match
/// exhaustively on [`FileOp`], so adding an operation kind is a
/// compile-time-checked decision everywhere it matters.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Meta key recording which path was kept for a duplicate action.
pub const META_KEPT: &str = "kept";
/// Meta key carrying a human-readable failure reason on `UndoFailed`.
pub const META_REASON: &str = "reason";
/// Meta key marking a `Move` that restores a file from the OS trash.
/// The value is always `"trash"`.
pub const META_RESTORE: &str = "restore";

/// The kind of mutation an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOp {
    /// Relocate a file to a different directory.
    Move,
    /// Rename a file within its directory. Inverted the same way as `Move`.
    Rename,
    /// Permanently delete a file. Irreversible.
    Delete,
    /// Send a file to the OS trash. Reversible only while the trash entry
    /// exists — undo is best-effort.
    Trash,
    /// Informational marker for a listed duplicate; never mutates disk.
    Duplicate,
    CreateDir,
    RemoveDir,
    /// Record of an undo attempt that could not be performed.
    UndoFailed,
}

/// A single planned filesystem mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAction {
    pub op: FileOp,
    pub src: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl FileAction {
    pub fn move_to(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            op: FileOp::Move,
            src: src.into(),
            dst: Some(dst.into()),
            meta: BTreeMap::new(),
        }
    }

    pub fn rename_to(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            op: FileOp::Rename,
            src: src.into(),
            dst: Some(dst.into()),
            meta: BTreeMap::new(),
        }
    }

    pub fn delete(src: impl Into<PathBuf>) -> Self {
        Self {
            op: FileOp::Delete,
            src: src.into(),
            dst: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn trash(src: impl Into<PathBuf>) -> Self {
        Self {
            op: FileOp::Trash,
            src: src.into(),
            dst: None,
            meta: BTreeMap::new(),
        }
    }

    /// Informational record that `src` duplicates `kept`.
    pub fn duplicate_of(src: impl Into<PathBuf>, kept: &Path) -> Self {
        let mut meta = BTreeMap::new();
        meta.insert(META_KEPT.to_string(), kept.to_string_lossy().into_owned());
        Self {
            op: FileOp::Duplicate,
            src: src.into(),
            dst: None,
            meta,
        }
    }

    pub fn create_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            op: FileOp::CreateDir,
            src: path.into(),
            dst: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn remove_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            op: FileOp::RemoveDir,
            src: path.into(),
            dst: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn undo_failed(src: impl Into<PathBuf>, reason: &str) -> Self {
        let mut meta = BTreeMap::new();
        meta.insert(META_REASON.to_string(), reason.to_string());
        Self {
            op: FileOp::UndoFailed,
            src: src.into(),
            dst: None,
            meta,
        }
    }

    /// A `Move` that restores `original` from the OS trash back to its
    /// pre-trash location. Recognized by the executor via [`META_RESTORE`].
    pub fn restore_from_trash(original: impl Into<PathBuf>) -> Self {
        let original = original.into();
        let mut meta = BTreeMap::new();
        meta.insert(META_RESTORE.to_string(), "trash".to_string());
        Self {
            op: FileOp::Move,
            src: original.clone(),
            dst: Some(original),
            meta,
        }
    }

    /// Add an extra meta entry. Consumes and returns the action so planners
    /// can chain it during construction.
    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    /// Whether this is a trash-restore `Move` (the inverse of `Trash`).
    pub fn is_trash_restore(&self) -> bool {
        self.op == FileOp::Move && self.meta.get(META_RESTORE).map(String::as_str) == Some("trash")
    }

    /// Whether executing this action can later be undone.
    ///
    /// `Trash` counts as reversible: restore is best-effort and degrades to
    /// an `UndoFailed` record if the trash entry is gone by undo time.
    pub fn is_reversible(&self) -> bool {
        match self.op {
            FileOp::Move | FileOp::Rename | FileOp::CreateDir | FileOp::RemoveDir => true,
            FileOp::Trash => true,
            FileOp::Delete | FileOp::Duplicate | FileOp::UndoFailed => false,
        }
    }

    /// Whether this action destroys data with no recovery path. Callers use
    /// this to warn before requesting `apply=true`.
    pub fn is_destructive(&self) -> bool {
        self.op == FileOp::Delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every field must survive a JSON round trip — undo correctness
    /// depends on exact reconstruction of persisted actions.
    #[test]
    fn action_round_trips_through_json() {
        let action = FileAction::move_to("/a/b.txt", "/a/txt/b.txt").with_meta("bucket", "txt");
        let json = serde_json::to_string(&action).unwrap();
        let back: FileAction = serde_json::from_str(&json).unwrap();
        assert_eq!(action, back);
    }

    #[test]
    fn op_tags_are_snake_case() {
        let action = FileAction::undo_failed("/x", "gone");
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"undo_failed\""), "got: {json}");
    }

    #[test]
    fn reversibility_classification() {
        assert!(FileAction::move_to("/a", "/b").is_reversible());
        assert!(FileAction::trash("/a").is_reversible());
        assert!(!FileAction::delete("/a").is_reversible());
        assert!(FileAction::delete("/a").is_destructive());
        assert!(!FileAction::trash("/a").is_destructive());
    }

    #[test]
    fn trash_restore_marker_is_detected() {
        let restore = FileAction::restore_from_trash("/home/u/doc.pdf");
        assert!(restore.is_trash_restore());
        assert!(!FileAction::move_to("/a", "/b").is_trash_restore());
    }
}
