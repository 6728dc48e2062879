/// Clean planner — archive, trash, or delete files by age and size.
use crate::error::{Error, Result};
use crate::model::{FileAction, PreviewResult, ScanOutcome};
use crate::planner::{plan_remove_empty, unique_destination};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// What happens to a matched file when no archive directory is set.
///
/// Trash and permanent deletion are mutually exclusive by construction —
/// there is no flag combination that requests both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposal {
    /// Send to the OS trash (reversible while the trash entry exists).
    #[default]
    Trash,
    /// Permanently delete. Irreversible — previews flag these actions.
    Delete,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanPolicy {
    /// Match files whose mtime is older than this many days.
    pub older_than_days: Option<u32>,
    /// Match files at least this many megabytes large.
    pub larger_than_mb: Option<u64>,
    /// When set, matched files are moved here instead of disposed of.
    /// Always wins over `disposal`.
    pub archive_dir: Option<PathBuf>,
    pub disposal: Disposal,
    pub remove_empty: bool,
}

impl CleanPolicy {
    /// Reject filterless requests before any scan work: a clean with no
    /// filter would match every file.
    pub fn validate(&self) -> Result<()> {
        if self.older_than_days.is_none() && self.larger_than_mb.is_none() {
            return Err(Error::InvalidPolicy(
                "at least one filter is required: older_than_days or larger_than_mb".to_string(),
            ));
        }
        Ok(())
    }
}

/// Plan disposal actions for files matching the policy filters. Both
/// filters narrow the set (AND); at least one is required.
pub fn plan_clean(scan: &ScanOutcome, policy: &CleanPolicy) -> Result<PreviewResult> {
    policy.validate()?;

    let cutoff = policy
        .older_than_days
        .map(|days| SystemTime::now() - Duration::from_secs(u64::from(days) * 86_400));
    let min_size = policy.larger_than_mb.map(|mb| mb * 1024 * 1024);

    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut actions = Vec::new();
    let mut matched_bytes = 0u64;
    let mut final_locations: HashSet<PathBuf> = HashSet::new();

    for entry in &scan.files {
        let old_enough = match (cutoff, entry.modified) {
            (Some(cutoff), Some(mtime)) => mtime < cutoff,
            // No mtime available: we cannot prove the file is old.
            (Some(_), None) => false,
            (None, _) => true,
        };
        let large_enough = min_size.is_none_or(|min| entry.size >= min);

        if !(old_enough && large_enough) {
            final_locations.insert(entry.path.clone());
            continue;
        }
        matched_bytes += entry.size;

        if let Some(archive) = &policy.archive_dir {
            let name = entry.path.file_name().unwrap_or_default();
            let dst = unique_destination(archive.join(name), &mut taken);
            final_locations.insert(dst.clone());
            actions.push(FileAction::move_to(&entry.path, dst));
        } else {
            match policy.disposal {
                Disposal::Trash => actions.push(FileAction::trash(&entry.path)),
                Disposal::Delete => actions.push(FileAction::delete(&entry.path)),
            }
        }
    }

    if policy.remove_empty {
        actions.extend(plan_remove_empty(scan, &final_locations));
    }

    Ok(PreviewResult {
        actions,
        files_scanned: scan.files.len(),
        total_size_bytes: matched_bytes,
        message: None,
    })
}
