//! `notify`-backed watcher for the two rule files.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{debounce, ReloadRequests};
use crate::loader::{Result, RuleError};

/// A watched rule file, resolved against its canonical parent directory.
#[derive(Debug, Clone)]
struct Target {
    dir: PathBuf,
    name: OsString,
    /// Path as configured, reported in change signals.
    configured: PathBuf,
}

impl Target {
    fn matches(&self, path: &Path) -> bool {
        path.file_name() == Some(self.name.as_os_str()) && path.parent() == Some(self.dir.as_path())
    }
}

/// Live filesystem watcher. Dropping it stops both the OS watch and the debouncer.
pub struct ChangeWatcher {
    /// Held to keep the OS watch alive.
    _watcher: RecommendedWatcher,
    debouncer: JoinHandle<()>,
}

impl ChangeWatcher {
    /// Watch `paths` and feed debounced change signals into `requests`.
    ///
    /// Parent directories are watched rather than the files themselves, so a
    /// file that is deleted, recreated or replaced by rename keeps being seen.
    /// Missing parent directories are created. Must be called from within a
    /// tokio runtime.
    pub fn start(paths: &[PathBuf], window: Duration, requests: Arc<ReloadRequests>) -> Result<Self> {
        let targets = paths.iter().map(|p| resolve_target(p)).collect::<Result<Vec<_>>>()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let filter = targets.clone();
        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if !is_change(&event.kind) {
                        return;
                    }
                    for path in &event.paths {
                        for target in filter.iter().filter(|t| t.matches(path)) {
                            debug!(path = %target.configured.display(), kind = ?event.kind, "rule file event");
                            // Receiver gone means the watcher is being torn down.
                            let _ = tx.send(target.configured.clone());
                        }
                    }
                }
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            }
        })?;

        let dirs: BTreeSet<&Path> = targets.iter().map(|t| t.dir.as_path()).collect();
        for dir in dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            info!(path = %dir.display(), "watching rule directory for changes");
        }

        let debouncer = tokio::spawn(debounce(rx, window, requests));
        Ok(Self {
            _watcher: watcher,
            debouncer,
        })
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.debouncer.abort();
    }
}

/// Writes, creations, renames and removals all count; access does not.
fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn resolve_target(path: &Path) -> Result<Target> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    let name = absolute
        .file_name()
        .ok_or_else(|| RuleError::InvalidPath(path.to_path_buf()))?
        .to_os_string();
    let parent = absolute
        .parent()
        .ok_or_else(|| RuleError::InvalidPath(path.to_path_buf()))?;

    if !parent.exists() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!(path = %parent.display(), error = %e, "failed to create rule directory");
            return Err(e.into());
        }
    }

    Ok(Target {
        dir: parent.canonicalize()?,
        name,
        configured: path.to_path_buf(),
    })
}
