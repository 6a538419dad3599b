//! Second pipeline pass: rewrite inline Markdown links against the name map.
//!
//! Only `[label](target)` references are in scope. The target may be
//! percent-encoded; its final path component is matched against original raw
//! filenames, and on a hit the whole target substring is replaced with the
//! canonical name. Each file is fully buffered before it is written back, so
//! a mid-file failure never leaves a partially rewritten document.

use anyhow::Result;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::config::{Config, Layout};
use crate::mapping::NameMap;

static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\(([^)]*)\)").unwrap());

#[derive(Debug, Default)]
pub struct RelinkSummary {
    pub files_scanned: usize,
    pub files_rewritten: usize,
    pub files_failed: usize,
    pub links_rewritten: usize,
}

/// Rewrites links in every `.md` document under the output root. An empty map
/// is a logged no-op: no file is touched.
pub fn rewrite_links(config: &Config, map: &NameMap) -> Result<RelinkSummary> {
    let mut summary = RelinkSummary::default();

    if map.is_empty() {
        log::error!("no mapping available to rewrite links");
        return Ok(summary);
    }

    for entry in WalkDir::new(&config.output.root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("failed to read output entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        summary.files_scanned += 1;
        match rewrite_file(entry.path(), map) {
            Ok(0) => {}
            Ok(hits) => {
                log::info!("updated {} links in {}", hits, entry.path().display());
                summary.files_rewritten += 1;
                summary.links_rewritten += hits;
            }
            Err(e) => {
                log::error!(
                    "failed to rewrite links in {}: {:#}",
                    entry.path().display(),
                    e
                );
                summary.files_failed += 1;
            }
        }
    }

    // The combined layout treats the mapping as consumed once links are
    // fixed. A failed file still needs it for a retry, so the mapping
    // survives any failure.
    if config.output.layout == Layout::Combined {
        let mapping_file = config.mapping_file();
        if summary.files_failed > 0 {
            log::warn!(
                "keeping {}: {} file(s) failed to rewrite",
                mapping_file.display(),
                summary.files_failed
            );
        } else if let Err(e) = fs::remove_file(&mapping_file) {
            log::error!("failed to delete {}: {}", mapping_file.display(), e);
        } else {
            log::info!("deleted mapping file {}", mapping_file.display());
        }
    }

    Ok(summary)
}

/// Loads the persisted mapping and runs the rewrite pass. A missing or empty
/// mapping file logs an error and leaves every output file untouched.
pub fn run_relink(config: &Config) -> Result<()> {
    let mapping_file = config.mapping_file();
    if !mapping_file.exists() {
        log::error!(
            "no mapping file at {}; run materialize first",
            mapping_file.display()
        );
        return Ok(());
    }

    let map = NameMap::load(&mapping_file)?;
    let summary = rewrite_links(config, &map)?;
    print_summary(&summary);
    Ok(())
}

pub fn print_summary(summary: &RelinkSummary) {
    println!("relink");
    println!("  files scanned: {}", summary.files_scanned);
    println!("  files rewritten: {}", summary.files_rewritten);
    if summary.files_failed > 0 {
        println!("  files failed: {}", summary.files_failed);
    }
    println!("  links rewritten: {}", summary.links_rewritten);
}

/// Rewrites one document, returning the number of links changed. The whole
/// rewritten content is buffered and only committed when it differs.
fn rewrite_file(path: &Path, map: &NameMap) -> Result<usize> {
    let content = fs::read_to_string(path)?;

    let mut rewritten = String::with_capacity(content.len());
    let mut hits = 0;
    for line in content.split_inclusive('\n') {
        let (new_line, line_hits) = rewrite_line(line, map);
        rewritten.push_str(&new_line);
        hits += line_hits;
    }

    if hits > 0 && rewritten != content {
        fs::write(path, rewritten)?;
    }

    Ok(hits)
}

/// Rewrites every matched link target in one line. Lines with no matching
/// target pass through byte-identical.
fn rewrite_line(line: &str, map: &NameMap) -> (String, usize) {
    let mut out = line.to_string();
    let mut hits = 0;

    for captures in INLINE_LINK.captures_iter(line) {
        let target = &captures[1];
        if target.is_empty() {
            continue;
        }
        let decoded = percent_decode_str(target).decode_utf8_lossy();
        let candidate = decoded.rsplit('/').next().unwrap_or_default();

        if let Some(canonical) = map.get(candidate) {
            if target != canonical {
                out = out.replace(target, canonical);
                hits += 1;
            }
        }
    }

    (out, hits)
}
