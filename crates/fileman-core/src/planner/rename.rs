/// Rename planner — bulk rename with pattern replacement, prefix/suffix,
/// case transforms, sanitization, and enumeration.
use crate::error::{Error, Result};
use crate::model::{FileAction, PreviewResult, ScanOutcome};
use crate::planner::unique_destination;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenamePolicy {
    /// Regex matched against the filename stem; `$1`-style capture
    /// references are available in `replace`.
    pub pattern: Option<String>,
    pub replace: String,
    pub prefix: String,
    pub suffix: String,
    /// `lower` and `upper` are mutually exclusive; requesting both is a
    /// planning error.
    pub lower: bool,
    pub upper: bool,
    /// Replace characters illegal or awkward on common filesystems.
    pub sanitize: bool,
    /// Append `_NNN` counters to the stem.
    pub enumerate: bool,
    pub start: u32,
    pub step: u32,
    pub width: usize,
    /// Only process files with this extension (leading dot optional).
    pub ext_filter: Option<String>,
}

impl Default for RenamePolicy {
    fn default() -> Self {
        Self {
            pattern: None,
            replace: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            lower: false,
            upper: false,
            sanitize: false,
            enumerate: false,
            start: 1,
            step: 1,
            width: 3,
            ext_filter: None,
        }
    }
}

impl RenamePolicy {
    /// Reject invalid flag combinations and patterns before any scan work.
    pub fn validate(&self) -> Result<()> {
        if self.lower && self.upper {
            return Err(Error::InvalidPolicy(
                "`lower` and `upper` are mutually exclusive".to_string(),
            ));
        }
        if let Some(pattern) = self.pattern.as_deref() {
            Regex::new(pattern)?;
        }
        Ok(())
    }
}

/// Keep ASCII alphanumerics, dot, underscore, space, and dash; everything
/// else becomes `_`. Runs of whitespace collapse to a single space.
fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ' ' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plan one `Rename` per file whose transformed name differs from its
/// current one. Transforms apply in order: regex replacement, prefix,
/// suffix, case, sanitization, enumeration.
pub fn plan_rename(scan: &ScanOutcome, policy: &RenamePolicy) -> Result<PreviewResult> {
    policy.validate()?;
    let regex = policy
        .pattern
        .as_deref()
        .map(Regex::new)
        .transpose()?;
    let only_ext = policy
        .ext_filter
        .as_deref()
        .map(|e| e.trim_start_matches('.').to_lowercase());

    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut actions = Vec::new();
    let mut renamed_bytes = 0u64;
    let mut counter = policy.start;

    for entry in &scan.files {
        let mut ext = entry
            .path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(only) = &only_ext {
            if ext.to_lowercase() != *only {
                continue;
            }
        }
        let old_name = match entry.path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };

        let mut name = entry
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(regex) = &regex {
            name = regex.replace_all(&name, policy.replace.as_str()).into_owned();
        }
        name = format!("{}{}{}", policy.prefix, name, policy.suffix);
        if policy.lower {
            name = name.to_lowercase();
        } else if policy.upper {
            name = name.to_uppercase();
        }
        if policy.sanitize {
            // The whole filename gets sanitized, extension included.
            name = sanitize_name(&name);
            ext = sanitize_name(&ext);
        }
        if policy.enumerate {
            name = format!("{name}_{counter:0width$}", width = policy.width);
            counter += policy.step;
        }

        let new_name = if ext.is_empty() {
            name
        } else {
            format!("{name}.{ext}")
        };
        if new_name == old_name {
            continue;
        }

        let desired = entry.path.with_file_name(&new_name);
        let dst = unique_destination(desired, &mut taken);
        renamed_bytes += entry.size;
        actions.push(FileAction::rename_to(&entry.path, dst));
    }

    Ok(PreviewResult {
        actions,
        files_scanned: scan.files.len(),
        total_size_bytes: renamed_bytes,
        message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{scan_collect, ScanOptions};
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap();
    }

    fn scan(root: &Path) -> ScanOutcome {
        scan_collect(root, &ScanOptions::default()).unwrap()
    }

    #[test]
    fn regex_replacement_with_capture_groups() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("IMG_001.jpg"));

        let policy = RenamePolicy {
            pattern: Some(r"IMG_(\d+)".to_string()),
            replace: "photo_$1".to_string(),
            ..Default::default()
        };
        let preview = plan_rename(&scan(tmp.path()), &policy).unwrap();
        assert_eq!(preview.actions.len(), 1);
        assert_eq!(
            preview.actions[0].dst.as_ref().unwrap(),
            &tmp.path().join("photo_001.jpg")
        );
    }

    #[test]
    fn lower_and_upper_together_is_a_planning_error() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("x.txt"));

        let policy = RenamePolicy {
            lower: true,
            upper: true,
            ..Default::default()
        };
        assert!(matches!(
            plan_rename(&scan(tmp.path()), &policy),
            Err(Error::InvalidPolicy(_))
        ));
    }

    #[test]
    fn invalid_regex_is_rejected_before_planning() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("x.txt"));

        let policy = RenamePolicy {
            pattern: Some("[unclosed".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            plan_rename(&scan(tmp.path()), &policy),
            Err(Error::Regex(_))
        ));
    }

    #[test]
    fn colliding_destinations_get_increasing_suffixes() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a.txt"));
        touch(&tmp.path().join("a (copy).txt"));

        // Strip everything after 'a' so both files map to "a_renamed.txt".
        let policy = RenamePolicy {
            pattern: Some(r"^a.*".to_string()),
            replace: "a_renamed".to_string(),
            ..Default::default()
        };
        let preview = plan_rename(&scan(tmp.path()), &policy).unwrap();
        assert_eq!(preview.actions.len(), 2);
        let dsts: Vec<_> = preview
            .actions
            .iter()
            .map(|a| a.dst.clone().unwrap())
            .collect();
        // "a (copy).txt" sorts before "a.txt", so it claims the bare name.
        assert_eq!(dsts[0], tmp.path().join("a_renamed.txt"));
        assert_eq!(dsts[1], tmp.path().join("a_renamed-1.txt"));
    }

    #[test]
    fn destination_never_collides_with_untouched_existing_file() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("new.txt"));
        touch(&tmp.path().join("final.txt")); // untouched, already there

        let policy = RenamePolicy {
            pattern: Some("new".to_string()),
            replace: "final".to_string(),
            ext_filter: None,
            ..Default::default()
        };
        // Restrict the plan to new.txt by pattern: final.txt is unchanged
        // (its stem has no "new") and therefore skipped as a no-op.
        let preview = plan_rename(&scan(tmp.path()), &policy).unwrap();
        assert_eq!(preview.actions.len(), 1);
        assert_eq!(
            preview.actions[0].dst.as_ref().unwrap(),
            &tmp.path().join("final-1.txt")
        );
    }

    #[test]
    fn prefix_suffix_case_and_sanitize_apply_in_order() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("My Räw File.dat"));

        let policy = RenamePolicy {
            prefix: "x_".to_string(),
            suffix: "_y".to_string(),
            lower: true,
            sanitize: true,
            ..Default::default()
        };
        let preview = plan_rename(&scan(tmp.path()), &policy).unwrap();
        assert_eq!(
            preview.actions[0].dst.as_ref().unwrap(),
            &tmp.path().join("x_my r_w file_y.dat")
        );
    }

    #[test]
    fn sanitize_covers_the_extension_too() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("notes.t#xt"));

        let policy = RenamePolicy {
            sanitize: true,
            ..Default::default()
        };
        let preview = plan_rename(&scan(tmp.path()), &policy).unwrap();
        assert_eq!(preview.actions.len(), 1);
        assert_eq!(
            preview.actions[0].dst.as_ref().unwrap(),
            &tmp.path().join("notes.t_xt")
        );
    }

    #[test]
    fn enumeration_appends_padded_counters_per_filtered_subset() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a.jpg"));
        touch(&tmp.path().join("b.jpg"));
        touch(&tmp.path().join("notes.txt"));

        let policy = RenamePolicy {
            enumerate: true,
            start: 5,
            step: 5,
            width: 4,
            ext_filter: Some("jpg".to_string()),
            ..Default::default()
        };
        let preview = plan_rename(&scan(tmp.path()), &policy).unwrap();
        assert_eq!(preview.actions.len(), 2);
        assert_eq!(
            preview.actions[0].dst.as_ref().unwrap(),
            &tmp.path().join("a_0005.jpg")
        );
        assert_eq!(
            preview.actions[1].dst.as_ref().unwrap(),
            &tmp.path().join("b_0010.jpg")
        );
    }

    #[test]
    fn unchanged_names_produce_no_actions() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("already_fine.txt"));

        let preview = plan_rename(&scan(tmp.path()), &RenamePolicy::default()).unwrap();
        assert!(preview.actions.is_empty());
        assert_eq!(preview.files_scanned, 1);
    }
}
