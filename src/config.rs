use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub layout: Layout,
}

/// Output layout modes.
///
/// `flat` places every document at one level under the output root, folding
/// the parent folder into the filename. `grouped` keeps one subdirectory per
/// first-level source directory and flattens within each group. `combined`
/// additionally concatenates all sources into a single delimited document.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Flat,
    Grouped,
    Combined,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Flat => "flat",
            Layout::Grouped => "grouped",
            Layout::Combined => "combined",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Optional inbox directory watched for `.zip` exports to unpack.
    #[serde(default)]
    pub inbox: Option<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            inbox: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

impl Config {
    /// Directory that receives the flat copies. Same as the output root
    /// except in the combined layout, which copies under `<root>/flat`.
    pub fn copy_root(&self) -> PathBuf {
        match self.output.layout {
            Layout::Combined => self.output.root.join("flat"),
            _ => self.output.root.clone(),
        }
    }

    /// Location of the persisted name mapping for the active layout.
    pub fn mapping_file(&self) -> PathBuf {
        self.copy_root().join("mapping.txt")
    }

    /// Location of the combined document (combined layout only).
    pub fn combined_file(&self) -> PathBuf {
        self.output.root.join("files").join("combined.md")
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.source.root.as_os_str().is_empty() {
        anyhow::bail!("source.root must not be empty");
    }

    if config.output.root.as_os_str().is_empty() {
        anyhow::bail!("output.root must not be empty");
    }

    if config.source.include_globs.is_empty() {
        anyhow::bail!("source.include_globs must not be empty");
    }

    if config.watch.debounce_ms == 0 {
        anyhow::bail!("watch.debounce_ms must be > 0");
    }

    Ok(config)
}
