/// Scanner module — directory traversal and the streamed index operation.
///
/// [`walk`] provides the iterative, prune-aware walker used by every
/// operation kind. [`start_index_scan`] runs a full inventory on a
/// background thread with cancellable progress, the same handle/channel
/// pattern as the duplicate scan.
pub mod walk;

pub use walk::{scan_collect, Scan, ScanOptions};

use crate::hasher::{hash_file, HashAlgorithm};
use crate::model::{FileEntry, IndexEntry, IndexSummary};
use crate::progress::{should_emit, spawn_task, ProgressPhase, TaskHandle};
use std::path::PathBuf;
use std::time::UNIX_EPOCH;
use tracing::warn;

fn index_entry(entry: &FileEntry, algo: Option<HashAlgorithm>) -> IndexEntry {
    let digest = algo.and_then(|algo| match hash_file(&entry.path, algo) {
        Ok(digest) => Some(digest),
        Err(err) => {
            warn!("could not hash {}: {err}", entry.path.display());
            None
        }
    });
    IndexEntry {
        path: entry.path.clone(),
        name: entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size_bytes: entry.size,
        mtime_epoch: entry
            .modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0),
        digest,
    }
}

/// Build a file inventory of `root`, blocking until done.
pub fn index(
    root: &std::path::Path,
    options: &ScanOptions,
    algo: Option<HashAlgorithm>,
) -> crate::error::Result<IndexSummary> {
    let outcome = scan_collect(root, options)?;
    let files: Vec<IndexEntry> = outcome.files.iter().map(|f| index_entry(f, algo)).collect();
    let total_size_bytes = files.iter().map(|f| f.size_bytes).sum();
    Ok(IndexSummary {
        total_files: files.len(),
        total_size_bytes,
        files,
    })
}

/// Start an index scan on a background thread.
///
/// Streams `Progress` through a scanning phase (file count only, total
/// unknown) and an indexing phase (stat plus optional digest per file),
/// then exactly one `Complete { IndexSummary }` — or `Error` if the root
/// cannot be read. Cancellation stops the work between files.
pub fn start_index_scan(
    root: PathBuf,
    options: ScanOptions,
    algo: Option<HashAlgorithm>,
) -> TaskHandle<IndexSummary> {
    spawn_task("fileman-index-scan", move |ctx| {
        let scan = match Scan::new(&root, &options) {
            Ok(scan) => scan,
            Err(err) => {
                ctx.error(err.to_string());
                return;
            }
        };

        let mut files: Vec<FileEntry> = Vec::new();
        for entry in scan {
            if ctx.is_cancelled() {
                return;
            }
            files.push(entry);
            let n = files.len() as u64;
            if should_emit(n, 0) {
                ctx.progress(n, 0, ProgressPhase::Scanning, None);
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let total = files.len() as u64;
        let mut rows: Vec<IndexEntry> = Vec::with_capacity(files.len());
        for (i, entry) in files.iter().enumerate() {
            if ctx.is_cancelled() {
                return;
            }
            rows.push(index_entry(entry, algo));
            let n = i as u64 + 1;
            if should_emit(n, total) {
                ctx.progress(n, total, ProgressPhase::Indexing, Some(&entry.path));
            }
        }

        let total_size_bytes = rows.iter().map(|f| f.size_bytes).sum();
        ctx.complete(IndexSummary {
            total_files: rows.len(),
            total_size_bytes,
            files: rows,
        });
    })
}
