/// Duplicate index — two-stage (size, digest) grouping over scan output.
///
/// Stage one buckets files by size: a file with a unique size cannot have
/// a content duplicate, so only size-sharing candidates are ever hashed.
/// Stage two hashes candidates across a bounded worker pool and groups by
/// digest. Digest results are sorted by path before grouping, so group
/// membership and `keep` selection are reproducible no matter which worker
/// finished first.
use crate::hasher::{hash_file, HashAlgorithm};
use crate::model::{DupeGroup, DupesSummary, FileEntry};
use crate::progress::{should_emit, spawn_task, ProgressPhase, TaskHandle};
use crate::scanner::{Scan, ScanOptions};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Files that share their size with at least one other file. Only these
/// are worth hashing.
fn size_candidates(files: &[FileEntry]) -> Vec<&FileEntry> {
    let mut by_size: HashMap<u64, Vec<&FileEntry>> = HashMap::new();
    for entry in files {
        by_size.entry(entry.size).or_default().push(entry);
    }
    let mut candidates: Vec<&FileEntry> = by_size
        .into_values()
        .filter(|group| group.len() >= 2)
        .flatten()
        .collect();
    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates
}

/// Hash candidates in parallel over a pool bounded at the core count.
///
/// `cancelled` is checked cooperatively before each file. Files that fail
/// to read are logged and dropped — a vanished candidate is a scan
/// warning, not a failure of the whole operation. The returned list is
/// sorted by path.
fn hash_candidates<C, P>(
    candidates: &[&FileEntry],
    algo: HashAlgorithm,
    cancelled: C,
    on_hashed: P,
) -> Vec<(PathBuf, u64, String)>
where
    C: Fn() -> bool + Sync,
    P: Fn(u64, &Path) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .thread_name(|i| format!("fileman-hash-{i}"))
        .build()
        .expect("failed to build hash worker pool");

    let done = AtomicU64::new(0);
    let mut hashed: Vec<(PathBuf, u64, String)> = pool.install(|| {
        candidates
            .par_iter()
            .filter_map(|entry| {
                if cancelled() {
                    return None;
                }
                match hash_file(&entry.path, algo) {
                    Ok(digest) => {
                        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                        on_hashed(n, &entry.path);
                        Some((entry.path.clone(), entry.size, digest))
                    }
                    Err(err) => {
                        warn!("could not hash {}: {err}", entry.path.display());
                        None
                    }
                }
            })
            .collect()
    });

    // Completion order is nondeterministic; grouping must not be.
    hashed.sort_by(|a, b| a.0.cmp(&b.0));
    hashed
}

fn build_groups(hashed: Vec<(PathBuf, u64, String)>, algo: HashAlgorithm) -> Vec<DupeGroup> {
    let mut by_digest: HashMap<(String, u64), Vec<PathBuf>> = HashMap::new();
    for (path, size, digest) in hashed {
        by_digest.entry((digest, size)).or_default().push(path);
    }

    let mut groups: Vec<DupeGroup> = by_digest
        .into_iter()
        .filter(|(_, paths)| paths.len() >= 2)
        .map(|((digest, size), mut paths)| {
            // Keep the shortest path, ties broken lexicographically.
            paths.sort_by(|a, b| {
                (a.as_os_str().len(), a.as_path()).cmp(&(b.as_os_str().len(), b.as_path()))
            });
            let keep = paths.remove(0);
            let count = paths.len() + 1;
            DupeGroup {
                hash: digest,
                hash_algo: algo.to_string(),
                size_bytes: size,
                count,
                keep,
                duplicates: paths,
                wasted_bytes: size * (count as u64 - 1),
            }
        })
        .collect();

    groups.sort_by(|a, b| a.keep.cmp(&b.keep));
    groups
}

/// Group scanned files into duplicate sets. Groups with fewer than two
/// members are never emitted.
pub fn group_by_hash(files: &[FileEntry], algo: HashAlgorithm) -> Vec<DupeGroup> {
    let candidates = size_candidates(files);
    let hashed = hash_candidates(&candidates, algo, || false, |_, _| {});
    build_groups(hashed, algo)
}

/// Scan `root` and summarize its duplicate groups, blocking until done.
pub fn find_dupes(
    root: &Path,
    options: &ScanOptions,
    algo: HashAlgorithm,
) -> crate::error::Result<DupesSummary> {
    let outcome = crate::scanner::scan_collect(root, options)?;
    Ok(DupesSummary::from_groups(group_by_hash(&outcome.files, algo)))
}

/// Start a duplicate scan on a background thread, streaming progress
/// through the scanning and hashing phases and finishing with a
/// `Complete { DupesSummary }` event.
pub fn start_dupe_scan(
    root: PathBuf,
    options: ScanOptions,
    algo: HashAlgorithm,
) -> TaskHandle<DupesSummary> {
    spawn_task("fileman-dupe-scan", move |ctx| {
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

        let candidates = size_candidates(&files);
        let total = candidates.len() as u64;
        ctx.progress(0, total, ProgressPhase::Hashing, None);

        let hashed = hash_candidates(
            &candidates,
            algo,
            || ctx.is_cancelled(),
            |n, path| {
                if should_emit(n, total) {
                    ctx.progress(n, total, ProgressPhase::Hashing, Some(path));
                }
            },
        );
        if ctx.is_cancelled() {
            return;
        }

        let summary = DupesSummary::from_groups(build_groups(hashed, algo));
        ctx.complete(summary);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().write_all(contents).unwrap();
    }

    fn scan(root: &Path) -> Vec<FileEntry> {
        crate::scanner::scan_collect(root, &ScanOptions::default())
            .unwrap()
            .files
    }

    #[test]
    fn three_identical_files_form_one_group() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("a.txt"), b"same content");
        write_file(&tmp.path().join("a copy.txt"), b"same content");
        write_file(&tmp.path().join("sub/third.txt"), b"same content");

        let groups = group_by_hash(&scan(tmp.path()), HashAlgorithm::Sha256);
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.count, 3);
        assert_eq!(group.duplicates.len(), 2);
        assert_eq!(group.hash_algo, "sha256");
        assert_eq!(group.size_bytes, 12);
        assert_eq!(group.wasted_bytes, 24);
        // Shortest path wins the keep slot.
        assert!(group.keep.ends_with("a.txt"), "keep was {:?}", group.keep);
        assert!(!group.duplicates.contains(&group.keep));
    }

    #[test]
    fn same_size_different_content_is_not_grouped() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("one.bin"), b"aaaa");
        write_file(&tmp.path().join("two.bin"), b"bbbb");

        let groups = group_by_hash(&scan(tmp.path()), HashAlgorithm::Sha256);
        assert!(groups.is_empty());
    }

    #[test]
    fn unique_sizes_are_never_hash_candidates() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("short.bin"), b"ab");
        write_file(&tmp.path().join("longer.bin"), b"abcdef");

        let files = scan(tmp.path());
        assert!(size_candidates(&files).is_empty());
    }

    #[test]
    fn grouping_is_deterministic_across_runs() {
        let tmp = TempDir::new().unwrap();
        for i in 0..6 {
            write_file(&tmp.path().join(format!("dupe{i}.dat")), b"payload");
        }
        write_file(&tmp.path().join("other.dat"), b"different");

        let files = scan(tmp.path());
        let first = group_by_hash(&files, HashAlgorithm::Blake3);
        let second = group_by_hash(&files, HashAlgorithm::Blake3);
        assert_eq!(first, second);
    }

    #[test]
    fn streamed_dupe_scan_completes_with_summary() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("x.log"), b"dup");
        write_file(&tmp.path().join("y.log"), b"dup");

        let handle = start_dupe_scan(
            tmp.path().to_path_buf(),
            ScanOptions::default(),
            HashAlgorithm::Sha256,
        );

        let mut summary = None;
        for event in handle.events.iter() {
            match event {
                crate::progress::ProgressEvent::Complete { result } => summary = Some(result),
                crate::progress::ProgressEvent::Error { message } => {
                    panic!("unexpected error event: {message}")
                }
                crate::progress::ProgressEvent::Progress { .. } => {}
            }
        }
        let summary = summary.expect("stream must terminate with Complete");
        assert_eq!(summary.total_groups, 1);
        assert_eq!(summary.total_duplicates, 1);
        assert_eq!(summary.total_wasted_bytes, 3);
    }

    #[test]
    fn streamed_dupe_scan_reports_missing_root_as_error() {
        let tmp = TempDir::new().unwrap();
        let handle = start_dupe_scan(
            tmp.path().join("missing"),
            ScanOptions::default(),
            HashAlgorithm::Sha256,
        );

        let events: Vec<_> = handle.events.iter().collect();
        assert!(matches!(
            events.last(),
            Some(crate::progress::ProgressEvent::Error { .. })
        ));
    }
}
