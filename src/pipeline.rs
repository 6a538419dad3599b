//! Pipeline orchestration.
//!
//! Coordinates the two-pass flow: materialize (copy + rename + record the
//! mapping) then relink (rewrite inline links against the mapping). The
//! mapping travels between the passes as an in-process value; the persisted
//! `mapping.txt` exists for the standalone `relink` command.

use anyhow::Result;
use std::path::Path;

use crate::combine;
use crate::config::{Config, Layout};
use crate::links;
use crate::materialize;
use crate::scan;

/// Capability the watch collaborator drives: one pipeline run per detected
/// change batch.
pub trait PipelineTrigger {
    fn on_change(&mut self, path: &Path) -> Result<()>;
}

/// The default trigger: a full materialize + relink run.
pub struct PipelineRunner<'a> {
    pub config: &'a Config,
}

impl PipelineTrigger for PipelineRunner<'_> {
    fn on_change(&mut self, path: &Path) -> Result<()> {
        log::info!("change detected: {}", path.display());
        run_pipeline(self.config)
    }
}

/// One full materialize-then-relink run. The source tree is scanned once;
/// the document list feeds both the materialize pass and the combined file.
pub fn run_pipeline(config: &Config) -> Result<()> {
    let documents = scan::scan_source_tree(config)?;
    let map = materialize::materialize_tree(config, &documents)?;

    if config.output.layout == Layout::Combined {
        let combined = combine::write_combined_file(config, &documents)?;
        println!("  combined: {}", combined.display());
    }

    let summary = links::rewrite_links(config, &map)?;
    links::print_summary(&summary);
    println!("ok");
    Ok(())
}

/// Prints the planned renames without writing anything.
pub fn run_dry(config: &Config) -> Result<()> {
    let documents = scan::scan_source_tree(config)?;

    println!("run (dry-run)");
    for doc in &documents {
        let (canonical, _) = materialize::plan_for(config, doc);
        println!("  {} -> {}", doc.relative.display(), canonical);
    }
    println!("  documents: {}", documents.len());
    Ok(())
}
