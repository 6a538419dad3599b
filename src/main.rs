//! # mdflat CLI
//!
//! `mdflat` flattens an exported Markdown tree into canonical filenames and
//! rewrites cross-document links to match. Export tools (Notion and friends)
//! produce nested folders with date prefixes and content GUIDs baked into the
//! names; `mdflat` strips the decoration, folds parent folders into the
//! filenames, and fixes every inline link that pointed at a renamed file.
//!
//! ## Usage
//!
//! ```bash
//! mdflat --config ./config/mdflat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mdflat run` | One-shot materialize + relink of the whole source tree |
//! | `mdflat materialize` | First pass only: copy, rename, persist `mapping.txt` |
//! | `mdflat relink` | Second pass only: rewrite links from the persisted mapping |
//! | `mdflat watch` | Run once, then re-run on every source tree change |
//! | `mdflat unpack <archive>` | Extract a zip export into the source root |
//! | `mdflat status` | Report roots, document counts and mapping presence |

mod combine;
mod config;
mod intake;
mod links;
mod mapping;
mod materialize;
mod normalize;
mod pipeline;
mod scan;
mod status;
mod watch;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mdflat — flatten exported Markdown trees and rewrite cross-document links.
#[derive(Parser)]
#[command(
    name = "mdflat",
    about = "Flattens exported Markdown trees into canonical filenames and rewrites cross-document links",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/mdflat.toml`. Source root, output root, layout
    /// and watch settings are read from this file.
    #[arg(long, global = true, default_value = "./config/mdflat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline once: materialize, then rewrite links.
    ///
    /// In the combined layout this also writes the single concatenated
    /// document with title delimiters.
    Run {
        /// Print the planned renames without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// First pass only: copy documents to canonical names and persist
    /// `mapping.txt` for a later relink.
    Materialize,

    /// Second pass only: rewrite links from the persisted `mapping.txt`.
    ///
    /// With no mapping present this logs an error and leaves every output
    /// file untouched.
    Relink,

    /// Run once, then watch the source tree (and inbox, when configured)
    /// and re-run the pipeline on change. Stops on Ctrl-C.
    Watch,

    /// Extract a zip export into the source root.
    Unpack {
        /// Path to the `.zip` archive.
        archive: PathBuf,
    },

    /// Report configured roots, document counts and mapping presence.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run { dry_run } => {
            if dry_run {
                pipeline::run_dry(&cfg)?;
            } else {
                pipeline::run_pipeline(&cfg)?;
            }
        }
        Commands::Materialize => {
            let documents = scan::scan_source_tree(&cfg)?;
            materialize::materialize_tree(&cfg, &documents)?;
            println!("ok");
        }
        Commands::Relink => {
            links::run_relink(&cfg)?;
        }
        Commands::Watch => {
            watch::run_watch(&cfg).await?;
        }
        Commands::Unpack { archive } => {
            let files = intake::unpack_archive(&archive, &cfg.source.root)?;
            println!("unpack {}", archive.display());
            println!("  extracted files: {}", files);
            println!("ok");
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
    }

    Ok(())
}
