//! The original → canonical filename table produced by materialization and
//! consumed by the link-rewrite pass.
//!
//! The map is an explicit value handed from one pass to the next; the
//! persisted `mapping.txt` form exists only so the relink pass can run in a
//! separate process. Format: one `<original> -> <canonical>` line per entry,
//! in discovery order.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

/// Insertion-ordered map of original raw filenames to canonical filenames.
///
/// Keys are raw filenames only, not paths: two source documents sharing a
/// filename in different directories collapse to one entry, last write wins.
#[derive(Debug, Default, Clone)]
pub struct NameMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mapping. A repeated original filename overwrites the
    /// canonical name in place, keeping the first-seen position.
    pub fn insert(&mut self, original: String, canonical: String) {
        match self.index.get(&original) {
            Some(&i) => self.entries[i].1 = canonical,
            None => {
                self.index.insert(original.clone(), self.entries.len());
                self.entries.push((original, canonical));
            }
        }
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.index
            .get(original)
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(o, c)| (o.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persists the map as a line-oriented table.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        for (original, canonical) in self.iter() {
            // Infallible on String.
            let _ = writeln!(out, "{} -> {}", original, canonical);
        }
        std::fs::write(path, out)
            .with_context(|| format!("Failed to write mapping file: {}", path.display()))?;
        log::info!("mapping saved to {}", path.display());
        Ok(())
    }

    /// Loads a persisted map. Malformed lines are logged and skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping file: {}", path.display()))?;

        let mut map = NameMap::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match line.split_once(" -> ") {
                Some((original, canonical)) => {
                    map.insert(original.to_string(), canonical.to_string())
                }
                None => log::warn!(
                    "skipping malformed mapping line {} in {}: {}",
                    number + 1,
                    path.display(),
                    line
                ),
            }
        }
        Ok(map)
    }
}
