//! First pipeline pass: copy source documents to their canonical locations.
//!
//! Walks the source tree, computes a canonical name per document, places the
//! copy under the layout's output directory and records every rename in a
//! [`NameMap`]. Collisions on the destination keep the existing file; the
//! mapping entry is still recorded so links can be fixed up.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::{Config, Layout};
use crate::mapping::NameMap;
use crate::normalize::{canonical_file_name, clean_folder_name};
use crate::scan::SourceDocument;

/// Materializes the scanned documents into the output layout and persists the
/// resulting name mapping to `mapping.txt`. The caller scans the source tree
/// once and shares the document list with the other passes.
pub fn materialize_tree(config: &Config, documents: &[SourceDocument]) -> Result<NameMap> {
    let copy_root = config.copy_root();
    fs::create_dir_all(&copy_root)
        .with_context(|| format!("Failed to create output directory: {}", copy_root.display()))?;

    let mut map = NameMap::new();
    let mut copied = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for doc in documents {
        let (canonical, destination) = plan_for(config, doc);

        // Recorded even when the copy is skipped or fails; last write wins
        // for duplicate raw filenames.
        map.insert(doc.file_name.clone(), canonical.clone());

        if destination.exists() {
            log::warn!("destination already exists, skipping copy: {}", destination.display());
            skipped += 1;
            continue;
        }

        match copy_preserving_mtime(&doc.path, &destination, doc.modified) {
            Ok(()) => {
                log::info!("processed: {} -> {}", doc.file_name, canonical);
                copied += 1;
            }
            Err(e) => {
                log::error!("failed to copy {}: {:#}", doc.file_name, e);
                failed += 1;
            }
        }
    }

    map.save(&config.mapping_file())?;

    println!("materialize");
    println!("  documents found: {}", documents.len());
    println!("  copied: {}", copied);
    println!("  skipped (existing): {}", skipped);
    if failed > 0 {
        println!("  failed: {}", failed);
    }
    println!("  mapping entries: {}", map.len());

    Ok(map)
}

/// Computes the canonical name and destination path for one document under
/// the active layout, without touching the filesystem.
pub fn plan_for(config: &Config, doc: &SourceDocument) -> (String, PathBuf) {
    let context = parent_context(doc, config.output.layout);
    let canonical = canonical_file_name(&doc.file_name, context.as_deref());

    let destination = match config.output.layout {
        Layout::Flat | Layout::Combined => config.copy_root().join(&canonical),
        Layout::Grouped => match group_segment(doc) {
            Some(group) => config
                .copy_root()
                .join(clean_folder_name(&group))
                .join(&canonical),
            None => config.copy_root().join(&canonical),
        },
    };

    (canonical, destination)
}

/// The directory-name string folded into the canonical filename, per layout.
///
/// Flat and combined layouts fold in the immediate parent of any nested
/// document. The grouped layout keeps the first-level directory as an output
/// subdirectory, so only parents deeper than the group are folded in.
fn parent_context(doc: &SourceDocument, layout: Layout) -> Option<String> {
    let parent = doc.relative.parent().filter(|p| !p.as_os_str().is_empty())?;
    let depth = parent.components().count();

    let folds = match layout {
        Layout::Flat | Layout::Combined => true,
        Layout::Grouped => depth >= 2,
    };
    if !folds {
        return None;
    }
    parent
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// First path segment under the source root, when the document is nested.
fn group_segment(doc: &SourceDocument) -> Option<String> {
    let mut components = doc.relative.components();
    let first = components.next()?;
    // The first component must be a directory, not the filename itself.
    components.next()?;
    Some(first.as_os_str().to_string_lossy().into_owned())
}

fn copy_preserving_mtime(source: &Path, destination: &Path, modified: SystemTime) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)
        .with_context(|| format!("copy to {}", destination.display()))?;
    let file = fs::OpenOptions::new().write(true).open(destination)?;
    file.set_modified(modified)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputConfig, SourceConfig, WatchConfig};

    fn doc(relative: &str) -> SourceDocument {
        let relative = PathBuf::from(relative);
        let file_name = relative
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        SourceDocument {
            path: PathBuf::from("/src").join(&relative),
            relative,
            file_name,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    fn config_with_layout(layout: Layout) -> Config {
        Config {
            source: SourceConfig {
                root: PathBuf::from("data"),
                include_globs: vec!["**/*.md".to_string()],
                exclude_globs: vec![],
                follow_symlinks: false,
            },
            output: OutputConfig {
                root: PathBuf::from("out"),
                layout,
            },
            watch: WatchConfig::default(),
        }
    }

    #[test]
    fn test_flat_folds_immediate_parent() {
        let config = config_with_layout(Layout::Flat);
        let (canonical, dest) = plan_for(&config, &doc("Event Bridge/Intro.md"));
        assert_eq!(canonical, "Event_Bridge_Intro.md");
        assert_eq!(dest, PathBuf::from("out/Event_Bridge_Intro.md"));
    }

    #[test]
    fn test_flat_root_level_has_no_context() {
        let config = config_with_layout(Layout::Flat);
        let (canonical, _) = plan_for(&config, &doc("Notes.md"));
        assert_eq!(canonical, "Notes.md");
    }

    #[test]
    fn test_flat_deep_nesting_uses_immediate_parent() {
        let config = config_with_layout(Layout::Flat);
        let (canonical, _) = plan_for(&config, &doc("a/b c/Page.md"));
        assert_eq!(canonical, "b_c_Page.md");
    }

    #[test]
    fn test_grouped_first_level_keeps_directory() {
        let config = config_with_layout(Layout::Grouped);
        let (canonical, dest) = plan_for(&config, &doc("guides abc123/Setup.md"));
        assert_eq!(canonical, "Setup.md");
        assert_eq!(dest, PathBuf::from("out/guides_abc123/Setup.md"));
    }

    #[test]
    fn test_grouped_directory_name_is_canonical() {
        // Runs of spaces in the group directory collapse to one underscore,
        // same as in filenames.
        let config = config_with_layout(Layout::Grouped);
        let (canonical, dest) = plan_for(&config, &doc("Event  Bridge/Setup.md"));
        assert_eq!(canonical, "Setup.md");
        assert_eq!(dest, PathBuf::from("out/Event_Bridge/Setup.md"));
    }

    #[test]
    fn test_grouped_deeper_nesting_folds_parent() {
        let config = config_with_layout(Layout::Grouped);
        let (canonical, dest) = plan_for(&config, &doc("guides/deep dir/Page.md"));
        assert_eq!(canonical, "deep_dir_Page.md");
        assert_eq!(dest, PathBuf::from("out/guides/deep_dir_Page.md"));
    }

    #[test]
    fn test_grouped_root_level_goes_under_root() {
        let config = config_with_layout(Layout::Grouped);
        let (canonical, dest) = plan_for(&config, &doc("Readme.md"));
        assert_eq!(canonical, "Readme.md");
        assert_eq!(dest, PathBuf::from("out/Readme.md"));
    }

    #[test]
    fn test_combined_copies_under_flat_subdirectory() {
        let config = config_with_layout(Layout::Combined);
        let (_, dest) = plan_for(&config, &doc("topic/Notes.md"));
        assert_eq!(dest, PathBuf::from("out/flat/topic_Notes.md"));
    }
}
