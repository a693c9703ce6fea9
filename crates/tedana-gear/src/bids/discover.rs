//! Input file discovery sweeps.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::Entities;

/// Run a glob pattern and return its matches, sorted.
fn glob_sorted(pattern: &str) -> Result<Vec<PathBuf>> {
    debug!(pattern, "Globbing");
    let paths = glob::glob(pattern).map_err(|source| Error::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matches: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable glob match");
                None
            }
        })
        .collect();
    matches.sort();
    Ok(matches)
}

/// Find the multi-echo task groups present in a `func/` directory.
///
/// Sweeps for `*echo*bold.nii.gz`, maps each hit to its grouping key and
/// returns the deduplicated keys in sorted order so runs are processed
/// deterministically. Files without `task-` or `echo-` entities are
/// skipped with a warning.
///
/// # Errors
///
/// Returns an error if the directory path cannot form a glob pattern.
pub fn discover_tasks(func_dir: &Path) -> Result<Vec<String>> {
    let pattern = func_dir.join("*echo*bold.nii.gz");
    let mut tasks = BTreeSet::new();

    for path in glob_sorted(&pattern.to_string_lossy())? {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        match Entities::parse(&name).task_key() {
            Some(key) => {
                tasks.insert(key);
            }
            None => warn!(file = %name, "Multi-echo file without task/echo entities, skipping"),
        }
    }

    Ok(tasks.into_iter().collect())
}

/// The preprocessed per-echo files of one task group, sorted so echo 1
/// comes first.
///
/// # Errors
///
/// Returns an error if the directory path cannot form a glob pattern.
pub fn echo_files(func_dir: &Path, task_key: &str) -> Result<Vec<PathBuf>> {
    let pattern = func_dir.join(format!("*{task_key}*echo*desc-preproc_bold.nii.gz"));
    glob_sorted(&pattern.to_string_lossy())
}

/// The JSON sidecar path of a NIfTI image (`.nii.gz` → `.json`).
#[must_use]
pub fn sidecar_path(nifti: &Path) -> PathBuf {
    let name = nifti.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    match name.strip_suffix(".nii.gz") {
        Some(stem) => nifti.with_file_name(format!("{stem}.json")),
        None => nifti.with_extension("json"),
    }
}

/// Read the echo time of an image from its JSON sidecar, in milliseconds.
///
/// Sidecars store `EchoTime` in seconds; tedana expects milliseconds.
///
/// # Errors
///
/// Returns an error if the sidecar is unreadable, not JSON, or lacks a
/// numeric `EchoTime`.
pub fn read_echo_time_ms(sidecar: &Path) -> Result<f64> {
    let raw = fs::read_to_string(sidecar).map_err(|e| Error::Sidecar {
        path: sidecar.to_path_buf(),
        message: format!("cannot read: {e}"),
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| Error::Sidecar {
        path: sidecar.to_path_buf(),
        message: format!("not valid JSON: {e}"),
    })?;

    value
        .get("EchoTime")
        .and_then(serde_json::Value::as_f64)
        .map(|seconds| seconds * 1000.0)
        .ok_or_else(|| Error::Sidecar {
            path: sidecar.to_path_buf(),
            message: "missing numeric EchoTime".to_string(),
        })
}

/// Find the preprocessed brain mask matching an output prefix.
///
/// # Errors
///
/// Returns an error if the directory path cannot form a glob pattern.
pub fn find_mask(func_dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let pattern = func_dir.join(format!("{prefix}*desc-brain_mask.nii.gz"));
    Ok(glob_sorted(&pattern.to_string_lossy())?.into_iter().next())
}

/// Locate the `sub-<label>/ses-<label>` session directory inside an
/// unpacked preprocessing tree.
///
/// Explicit labels take precedence; otherwise the first `sub-*` and
/// `ses-*` directories (sorted) are used. Returns the bare labels
/// (without their `sub-`/`ses-` prefixes) together with the session path.
///
/// # Errors
///
/// Returns an error if no matching subject or session directory exists.
pub fn discover_session_dir(
    fmriprep_dir: &Path,
    subject_label: Option<&str>,
    session_label: Option<&str>,
) -> Result<(String, String, PathBuf)> {
    let (sid, subject_dir) = resolve_labeled_dir(fmriprep_dir, "sub", subject_label)?;
    let (sesid, session_dir) = resolve_labeled_dir(&subject_dir, "ses", session_label)?;
    Ok((sid, sesid, session_dir))
}

fn resolve_labeled_dir(
    parent: &Path,
    kind: &str,
    label: Option<&str>,
) -> Result<(String, PathBuf)> {
    if let Some(label) = label {
        let dir = parent.join(format!("{kind}-{label}"));
        if !dir.is_dir() {
            return Err(Error::discovery(format!(
                "no {} directory at {}",
                kind,
                dir.display()
            )));
        }
        return Ok((label.to_string(), dir));
    }

    let needle = format!("{kind}-");
    let mut candidates: Vec<PathBuf> = fs::read_dir(parent)
        .map_err(|e| {
            Error::discovery(format!("cannot list {}: {e}", parent.display()))
        })?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .map(|n| n.to_string_lossy().starts_with(&needle))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    let dir = candidates.into_iter().next().ok_or_else(|| {
        Error::discovery(format!(
            "no {}-* directory under {}",
            kind,
            parent.display()
        ))
    })?;
    let label = dir
        .file_name()
        .map(|n| n.to_string_lossy()[needle.len()..].to_string())
        .unwrap_or_default();
    Ok((label, dir))
}
