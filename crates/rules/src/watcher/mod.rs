//! Change watcher: filesystem events → debounce → reload requests.
//!
//! The OS watcher forwards raw path events into a channel, the debouncer
//! collapses each settled burst into one [`ChangeSignal`], and the reload
//! coordinator consumes signals through [`ReloadRequests`].

mod debounce;
mod fs;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

pub use self::debounce::debounce;
pub use self::fs::ChangeWatcher;

/// One settled burst of changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSignal {
    /// Watched paths that saw events during the burst.
    pub paths: Vec<PathBuf>,
}

/// Pending-reload flag shared between the debouncer and the coordinator.
///
/// Any number of requests made before the coordinator wakes collapse into a
/// single wake-up, and their paths into a single [`ChangeSignal`].
#[derive(Debug, Default)]
pub struct ReloadRequests {
    notify: Notify,
    pending: Mutex<BTreeSet<PathBuf>>,
    signals: AtomicU64,
}

impl ReloadRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a reload as pending for the given paths.
    pub fn request<I>(&self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(paths);
        self.signals.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
    }

    /// Wait for the next pending reload and take its accumulated paths.
    pub async fn next(&self) -> ChangeSignal {
        self.notify.notified().await;
        let paths = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        ChangeSignal {
            paths: paths.into_iter().collect(),
        }
    }

    /// Total number of requests ever made.
    pub fn signals_sent(&self) -> u64 {
        self.signals.load(Ordering::Relaxed)
    }
}
