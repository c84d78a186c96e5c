//! Workbook discovery.
//!
//! Walks a directory and returns the workbooks matching the configured
//! include globs, minus excludes and Office lock files (`~$name.xlsx`).
//! Globs are matched against the path relative to the root with `/`
//! separators, and `*` does not cross directories: `*.xlsx` only sees the
//! top level, `**/*.xlsx` recurses.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::WorkbooksConfig;

/// Prefix Office uses for the lock file of an open workbook.
const LOCK_FILE_PREFIX: &str = "~$";

pub fn discover_workbooks(root: &Path, config: &WorkbooksConfig) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        bail!("Directory {} does not exist", root.display());
    }
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let exclude_set = build_globset(&config.exclude_globs)?;

    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry =
            entry.with_context(|| format!("Failed to scan directory {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if is_lock_file(path) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        paths.push(path.to_path_buf());
    }

    // Sort for deterministic ordering
    paths.sort();
    Ok(paths)
}

pub fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with(LOCK_FILE_PREFIX))
        .unwrap_or(false)
}

/// Absolute form of `path` when it can be resolved.
pub fn display_path(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
