use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};

/// Watch the given files and directories and run the callback whenever a
/// policy (`.xml`) or request (`.json`) file among them changes.
/// The callback is also invoked once immediately on startup.
pub fn watch_and_run<F>(paths: &[PathBuf], mut callback: F) -> anyhow::Result<()>
where
    F: FnMut(),
{
    callback();

    let (tx, rx) = mpsc::channel();

    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
    let dirs = watched_dirs(paths);
    for dir in &dirs {
        debouncer
            .watcher()
            .watch(dir, notify::RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = %dir.display(), "watching");
    }

    eprintln!("\nWatching {} director{} for changes (Ctrl-C to stop)…",
        dirs.len(),
        if dirs.len() == 1 { "y" } else { "ies" }
    );

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events
                    .iter()
                    .any(|e| e.kind == DebouncedEventKind::Any && is_watched_file(&e.path));
                if relevant {
                    eprintln!("\n--- File change detected, re-running filter ---\n");
                    callback();
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "watch error");
            }
            Err(e) => {
                tracing::error!(error = %e, "watch channel closed");
                break;
            }
        }
    }

    Ok(())
}

/// Directories to watch: directories as given, files by their parent.
fn watched_dirs(paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths
        .iter()
        .map(|p| {
            if p.is_dir() {
                p.clone()
            } else {
                match p.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                }
            }
        })
        .collect()
}

fn is_watched_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "xml" || ext == "json")
}
