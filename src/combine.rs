//! Combined layout: concatenate every source document into one file, each
//! preceded by a `--- <title> ---` delimiter line.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::scan::SourceDocument;

/// Writes `<output>/files/combined.md` from the scanned documents. A document
/// that fails to read is logged and skipped.
pub fn write_combined_file(config: &Config, documents: &[SourceDocument]) -> Result<PathBuf> {
    let mut sections = Vec::new();

    for doc in documents {
        let content = match fs::read_to_string(&doc.path) {
            Ok(content) => content,
            Err(e) => {
                log::error!("failed to read {}: {}", doc.file_name, e);
                continue;
            }
        };

        let title = extract_title(&content).unwrap_or_else(|| file_stem(&doc.file_name));
        sections.push(format!("--- {} ---\n{}\n", title, content.trim()));
    }

    let output = config.combined_file();
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&output, sections.join("\n"))
        .with_context(|| format!("Failed to write combined file: {}", output.display()))?;
    log::info!("combined {} documents into {}", sections.len(), output.display());

    Ok(output)
}

/// Title for a document: the first `# `-heading line, else the first
/// non-blank line with any leading `#` runs removed.
fn extract_title(content: &str) -> Option<String> {
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix('#') {
            if rest.starts_with(char::is_whitespace) {
                let title = rest.trim();
                if !title.is_empty() {
                    return Some(title.to_string());
                }
            }
        }
    }

    let first = content.trim().lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.trim_start_matches('#').trim_start().to_string())
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}
