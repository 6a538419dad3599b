use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::config::Config;

/// One eligible document discovered under the source root. Immutable for the
/// duration of a pipeline run; content is read later, at copy/combine time.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Full path of the document inside the source tree.
    pub path: PathBuf,
    /// Path relative to the source root.
    pub relative: PathBuf,
    /// Raw filename, the key used for mapping entries.
    pub file_name: String,
    /// Modification time, preserved on the output copy.
    pub modified: SystemTime,
}

/// Walks the source tree and returns eligible documents in a deterministic
/// order (sorted by relative path). A missing source root is fatal.
pub fn scan_source_tree(config: &Config) -> Result<Vec<SourceDocument>> {
    let root = &config.source.root;
    if !root.exists() {
        bail!("Source root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.source.include_globs)?;

    let mut excludes = vec!["**/.git/**".to_string()];
    excludes.extend(config.source.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut documents = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.source.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Per-document recoverable: an unreadable entry is skipped.
                log::error!("failed to read directory entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy();

        if exclude_set.is_match(rel_str.as_ref()) {
            continue;
        }
        if !include_set.is_match(rel_str.as_ref()) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        documents.push(SourceDocument {
            path: path.to_path_buf(),
            relative: relative.to_path_buf(),
            file_name,
            modified,
        });
    }

    documents.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(documents)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
