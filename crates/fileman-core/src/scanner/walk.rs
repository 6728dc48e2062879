/// Iterative directory walker.
///
/// Traversal uses an explicit stack, never recursion, so adversarially
/// deep trees cannot overflow the call stack. Exclude patterns that match
/// a directory prune the whole subtree without descending — critical on
/// trees containing dependency or cache directories. Symlinked directories
/// are followed, but a visited-identity set ((device, inode) on Unix,
/// canonical path elsewhere) detects cycles: a link leading back into an
/// already-visited directory is skipped and logged as a scan warning.
///
/// Errors reading an individual entry (permission denied, vanished file)
/// are logged and counted; the scan itself never aborts because of them.
use crate::error::Result;
use crate::model::{FileEntry, ScanOutcome};
use glob::Pattern;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Flags controlling a scan, shared by every operation kind.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub recursive: bool,
    /// Glob patterns matched against both the full path and the bare file
    /// name. A matching directory is pruned entirely.
    pub exclude: Vec<String>,
    /// When non-empty, only files matching one of these patterns are
    /// yielded. Directories are not filtered by `include`.
    pub include: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            exclude: Vec::new(),
            include: Vec::new(),
        }
    }
}

/// Identity set used for symlink-cycle detection.
struct VisitedDirs {
    #[cfg(unix)]
    ids: HashSet<(u64, u64)>,
    #[cfg(not(unix))]
    paths: HashSet<PathBuf>,
}

impl VisitedDirs {
    fn new() -> Self {
        Self {
            #[cfg(unix)]
            ids: HashSet::new(),
            #[cfg(not(unix))]
            paths: HashSet::new(),
        }
    }

    /// Record a directory; returns `false` if it was already visited.
    #[cfg(unix)]
    fn insert(&mut self, _path: &Path, meta: &fs::Metadata) -> bool {
        use std::os::unix::fs::MetadataExt;
        self.ids.insert((meta.dev(), meta.ino()))
    }

    #[cfg(not(unix))]
    fn insert(&mut self, path: &Path, _meta: &fs::Metadata) -> bool {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.paths.insert(key)
    }
}

/// Lazy sequence of [`FileEntry`] values from an iterative walk.
pub struct Scan {
    stack: Vec<PathBuf>,
    queue: VecDeque<FileEntry>,
    exclude: Vec<Pattern>,
    include: Vec<Pattern>,
    recursive: bool,
    visited: VisitedDirs,
    dirs: Vec<PathBuf>,
    warnings: u64,
}

impl Scan {
    /// Prepare a walk rooted at `root`. A root that is a single file yields
    /// exactly that file. A missing root is an error — the caller asked for
    /// something that does not exist, which is not a skippable warning.
    pub fn new(root: &Path, options: &ScanOptions) -> Result<Self> {
        let exclude = compile_patterns(&options.exclude)?;
        let include = compile_patterns(&options.include)?;

        let mut scan = Self {
            stack: Vec::new(),
            queue: VecDeque::new(),
            exclude,
            include,
            recursive: options.recursive,
            visited: VisitedDirs::new(),
            dirs: Vec::new(),
            warnings: 0,
        };

        let meta = fs::metadata(root)?;
        if meta.is_file() {
            scan.queue.push_back(FileEntry {
                path: root.to_path_buf(),
                size: meta.len(),
                modified: meta.modified().ok(),
            });
        } else {
            scan.visited.insert(root, &meta);
            scan.stack.push(root.to_path_buf());
        }
        Ok(scan)
    }

    /// Number of entries skipped with a warning so far.
    pub fn warnings(&self) -> u64 {
        self.warnings
    }

    /// Directories descended into so far, excluding the root.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn read_directory(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("skipping unreadable directory {}: {err}", dir.display());
                self.warnings += 1;
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry in {}: {err}", dir.display());
                    self.warnings += 1;
                    continue;
                }
            };
            let path = entry.path();

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    self.warnings += 1;
                    continue;
                }
            };

            if file_type.is_symlink() {
                self.visit_symlink(&path);
            } else if file_type.is_dir() {
                self.visit_dir(&path);
            } else {
                match entry.metadata() {
                    Ok(meta) => self.visit_file(&path, &meta),
                    Err(err) => {
                        warn!("skipping {}: {err}", path.display());
                        self.warnings += 1;
                    }
                }
            }
        }
    }

    fn visit_dir(&mut self, path: &Path) {
        if matches_any(path, &self.exclude) {
            return; // prune the whole subtree
        }
        if !self.recursive {
            return;
        }
        match fs::metadata(path) {
            Ok(meta) => {
                if !self.visited.insert(path, &meta) {
                    warn!("directory cycle at {}, skipping", path.display());
                    self.warnings += 1;
                    return;
                }
                self.dirs.push(path.to_path_buf());
                self.stack.push(path.to_path_buf());
            }
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                self.warnings += 1;
            }
        }
    }

    /// Follow a symlink one step. A link whose target directory was already
    /// visited is a cycle: skipped and reported, never followed.
    fn visit_symlink(&mut self, path: &Path) {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(err) => {
                warn!("skipping dangling symlink {}: {err}", path.display());
                self.warnings += 1;
                return;
            }
        };
        if meta.is_dir() {
            self.visit_dir(path);
        } else {
            self.visit_file(path, &meta);
        }
    }

    fn visit_file(&mut self, path: &Path, meta: &fs::Metadata) {
        if matches_any(path, &self.exclude) {
            return;
        }
        if !self.include.is_empty() && !matches_any(path, &self.include) {
            return;
        }
        self.queue.push_back(FileEntry {
            path: path.to_path_buf(),
            size: meta.len(),
            modified: meta.modified().ok(),
        });
    }
}

impl Iterator for Scan {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        loop {
            if let Some(entry) = self.queue.pop_front() {
                return Some(entry);
            }
            let dir = self.stack.pop()?;
            self.read_directory(&dir);
        }
    }
}

/// Run a walk to completion and collect a [`ScanOutcome`], with files in
/// sorted path order so downstream planning is deterministic.
pub fn scan_collect(root: &Path, options: &ScanOptions) -> Result<ScanOutcome> {
    let mut scan = Scan::new(root, options)?;
    let mut files: Vec<FileEntry> = (&mut scan).collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(ScanOutcome {
        root: root.to_path_buf(),
        files,
        dirs: scan.dirs,
        warnings: scan.warnings,
    })
}

fn compile_patterns(globs: &[String]) -> Result<Vec<Pattern>> {
    globs.iter().map(|g| Ok(Pattern::new(g)?)).collect()
}

/// Match against the full path or the bare file name, so both
/// `target/**` and `*.tmp` behave the way users expect.
fn matches_any(path: &Path, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|p| {
        p.matches_path(path)
            || path
                .file_name()
                .is_some_and(|name| p.matches(&name.to_string_lossy()))
    })
}
