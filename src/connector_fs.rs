use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SourcesConfig;

/// A candidate source file found under an intake directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scanned root, `/`-separated.
    pub relative: String,
}

/// Walk `root` and return files matching the include globs and none of the
/// exclude globs, sorted by relative path. A missing root yields no files.
pub fn scan_dir(root: &Path, sources: &SourcesConfig) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let include_set = build_globset(&sources.include_globs)?;

    let mut default_excludes = vec![
        "**/excluded/**".to_string(),
        "**/processed/**".to_string(),
        "**/index/**".to_string(),
    ];
    default_excludes.extend(sources.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(sources.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        // Apply exclude patterns
        if exclude_set.is_match(&rel_str) {
            continue;
        }

        // Apply include patterns
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(SourceFile {
            path: path.to_path_buf(),
            relative: rel_str,
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(files)
}

/// True when `root` has no entries at all. An empty subfolder counts as an
/// entry. A missing root is empty.
pub fn is_empty_dir(root: &Path) -> bool {
    !WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .any(|e| e.is_ok())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
