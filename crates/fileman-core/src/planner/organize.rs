/// Organize planner — bucket files into folders by extension or mtime.
use crate::error::Result;
use crate::model::{FileAction, FileEntry, PreviewResult, ScanOutcome};
use crate::planner::{plan_remove_empty, unique_destination};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizeBy {
    /// One folder per lowercase extension; `noext` for extensionless files.
    #[default]
    Ext,
    /// One folder per modification day, `YYYY-MM-DD` (UTC).
    Date,
    /// One folder per modification month, `YYYY-MM` (UTC).
    Month,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizePolicy {
    pub by: OrganizeBy,
    /// Destination base directory; defaults to the scan root.
    pub dest: Option<PathBuf>,
    /// Also emit `RemoveDir` for directories the moves would empty.
    pub remove_empty: bool,
}

fn bucket_for(entry: &FileEntry, by: OrganizeBy) -> String {
    match by {
        OrganizeBy::Ext => entry
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "noext".to_string()),
        OrganizeBy::Date | OrganizeBy::Month => {
            // Files with no reported mtime land in the epoch bucket rather
            // than being silently dropped from the plan.
            let mtime: DateTime<Utc> = entry.modified.unwrap_or(UNIX_EPOCH).into();
            let fmt = if by == OrganizeBy::Date {
                "%Y-%m-%d"
            } else {
                "%Y-%m"
            };
            mtime.format(fmt).to_string()
        }
    }
}

/// Plan one `Move` per file into `<base>/<bucket>/<filename>`. Files
/// already at their bucketed location are skipped.
pub fn plan_organize(scan: &ScanOutcome, policy: &OrganizePolicy) -> Result<PreviewResult> {
    let base = policy.dest.clone().unwrap_or_else(|| scan.root.clone());

    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut actions = Vec::new();
    let mut moved_bytes = 0u64;
    let mut final_locations: HashSet<PathBuf> = HashSet::new();

    for entry in &scan.files {
        let name = match entry.path.file_name() {
            Some(name) => name,
            None => continue,
        };
        let desired = base.join(bucket_for(entry, policy.by)).join(name);
        if desired == entry.path {
            final_locations.insert(entry.path.clone());
            continue;
        }
        let dst = unique_destination(desired, &mut taken);
        final_locations.insert(dst.clone());
        moved_bytes += entry.size;
        actions.push(FileAction::move_to(&entry.path, dst));
    }

    if policy.remove_empty {
        actions.extend(plan_remove_empty(scan, &final_locations));
    }

    Ok(PreviewResult {
        actions,
        files_scanned: scan.files.len(),
        total_size_bytes: moved_bytes,
        message: None,
    })
}
