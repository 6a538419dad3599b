//! Directory watch: re-runs the pipeline when the source tree changes.
//!
//! Events bridge from notify's callback thread through a channel into a
//! select loop. Raw events are coalesced per path during a quiet period, so
//! one editor save burst fires one pipeline run. Runs execute inline in the
//! loop; an event arriving mid-run waits in the channel, which is what keeps
//! concurrent materialize/relink passes from overlapping.

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::intake;
use crate::pipeline::{self, PipelineRunner, PipelineTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchAction {
    /// A zip export landed in the inbox: unpack it, then run the pipeline.
    Unpack,
    /// An eligible source document changed: run the pipeline.
    Run,
}

/// Watches the source root (and the inbox, when configured) until Ctrl-C.
pub async fn run_watch(config: &Config) -> Result<()> {
    if let Err(e) = pipeline::run_pipeline(config) {
        log::error!("initial pipeline run failed: {:#}", e);
    }

    let source_root = fs::canonicalize(&config.source.root).with_context(|| {
        format!("Source root does not exist: {}", config.source.root.display())
    })?;

    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher =
        notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            let _ = notify_tx.send(result);
        })?;
    watcher
        .watch(&source_root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", source_root.display()))?;

    let inbox = match &config.watch.inbox {
        Some(inbox) => {
            fs::create_dir_all(inbox)
                .with_context(|| format!("Failed to create inbox: {}", inbox.display()))?;
            let inbox = fs::canonicalize(inbox)?;
            watcher
                .watch(&inbox, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", inbox.display()))?;
            Some(inbox)
        }
        None => None,
    };

    // notify's callback is synchronous; a bridge thread feeds the async loop.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel(64);
    std::thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            match result {
                Ok(event) => {
                    if event_tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => log::error!("watch error: {}", e),
            }
        }
    });

    let mut debouncer = Debouncer::new(Duration::from_millis(config.watch.debounce_ms));
    let mut trigger = PipelineRunner { config };

    println!("watching {} (Ctrl-C to stop)", source_root.display());

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                println!("stopping watch");
                break;
            }
            Some(event) = event_rx.recv() => {
                add_event(&mut debouncer, &event, &source_root, inbox.as_deref());
            }
            _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                if let Some(batch) = debouncer.take_if_ready() {
                    handle_batch(config, batch, &mut trigger);
                }
            }
        }
    }

    // Releases the filesystem watch handles.
    drop(watcher);
    Ok(())
}

fn add_event(
    debouncer: &mut Debouncer,
    event: &notify::Event,
    source_root: &Path,
    inbox: Option<&Path>,
) {
    let is_remove = match relevant_kind(&event.kind) {
        Some(is_remove) => is_remove,
        None => return,
    };
    for path in &event.paths {
        if let Some(action) = classify(path, is_remove, source_root, inbox) {
            debouncer.add(path.clone(), action);
        }
    }
}

/// Filters event kinds down to content changes. Returns whether the event is
/// a removal, or `None` for kinds that never affect output (access events,
/// metadata-only modifications).
fn relevant_kind(kind: &notify::EventKind) -> Option<bool> {
    use notify::event::ModifyKind;
    use notify::EventKind;

    match kind {
        EventKind::Create(_) => Some(false),
        EventKind::Remove(_) => Some(true),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(false),
        _ => None,
    }
}

/// Decides what a changed path means: a fresh zip in the inbox is unpacked,
/// an eligible document under the source root triggers a pipeline run,
/// everything else (editor temp files, unrelated paths) is ignored.
fn classify(
    path: &Path,
    is_remove: bool,
    source_root: &Path,
    inbox: Option<&Path>,
) -> Option<WatchAction> {
    if is_temp_file(path) {
        return None;
    }
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    if !is_remove && extension == "zip" {
        if let Some(inbox) = inbox {
            if path.starts_with(inbox) {
                return Some(WatchAction::Unpack);
            }
        }
    }

    if path.starts_with(source_root) && extension == "md" {
        return Some(WatchAction::Run);
    }

    None
}

/// Editor temp/backup artifacts that must not trigger runs.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(extension, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

fn handle_batch(
    config: &Config,
    batch: HashMap<PathBuf, WatchAction>,
    trigger: &mut dyn PipelineTrigger,
) {
    let mut run_cause: Option<PathBuf> = None;

    for (path, action) in batch {
        match action {
            WatchAction::Unpack => match intake::unpack_archive(&path, &config.source.root) {
                Ok(files) => {
                    println!("unpacked {} ({} files)", path.display(), files);
                    run_cause.get_or_insert(path);
                }
                Err(e) => log::error!("failed to unpack {}: {:#}", path.display(), e),
            },
            WatchAction::Run => {
                run_cause.get_or_insert(path);
            }
        }
    }

    if let Some(path) = run_cause {
        if let Err(e) = trigger.on_change(&path) {
            log::error!("pipeline run failed: {:#}", e);
        }
    }
}

/// Pure coalescing state: paths accumulate until the quiet period elapses
/// with no further events, then the whole batch is taken at once.
struct Debouncer {
    quiet: Duration,
    pending: HashMap<PathBuf, WatchAction>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
            last_event: None,
        }
    }

    fn add(&mut self, path: PathBuf, action: WatchAction) {
        self.pending.insert(path, action);
        self.last_event = Some(Instant::now());
    }

    fn is_ready(&self) -> bool {
        match self.last_event {
            Some(last) => !self.pending.is_empty() && last.elapsed() >= self.quiet,
            None => false,
        }
    }

    fn take_if_ready(&mut self) -> Option<HashMap<PathBuf, WatchAction>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        Some(std::mem::take(&mut self.pending))
    }

    /// How long the select loop may sleep before the batch could be ready.
    fn sleep_duration(&self) -> Duration {
        match self.last_event {
            Some(last) => self
                .quiet
                .saturating_sub(last.elapsed())
                .max(Duration::from_millis(1)),
            None => Duration::from_secs(3600),
        }
    }
}
