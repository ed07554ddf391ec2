//! Reload coordinator: turns change signals into atomic, all-or-nothing table swaps.
//!
//! Both files are loaded as one transaction. Only when both load cleanly is
//! the merged table published; otherwise the previous table stays live and a
//! rejected [`ReloadOutcome`] is broadcast.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Notify};
use tracing::{error, info, warn};
use winroute_core::{RuleSource, RulesConfig};

use crate::loader::{self, LoadError, RuleSet};
use crate::table::{merge, RuleTable, SourceRecord, SourceStatus};
use crate::watcher::ReloadRequests;

/// Outcome channel capacity; slow subscribers lag rather than block reloads.
const OUTCOME_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Neither file loaded.
    BothFailed,
    /// Exactly one file failed; the other's rules were not applied either.
    PartialFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReloadStatus {
    Applied {
        generation: u64,
        generated: usize,
        manual: usize,
    },
    Rejected {
        reason: RejectReason,
        errors: Vec<LoadError>,
    },
}

/// Structured result of one reload attempt, for notification collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadOutcome {
    pub at: DateTime<Utc>,
    /// Paths whose changes triggered this reload. Empty for manual reloads.
    pub trigger: Vec<PathBuf>,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub status: ReloadStatus,
}

impl ReloadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, ReloadStatus::Applied { .. })
    }

    pub fn errors(&self) -> &[LoadError] {
        match &self.status {
            ReloadStatus::Rejected { errors, .. } => errors,
            ReloadStatus::Applied { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Loading,
}

pub struct ReloadCoordinator {
    table: Arc<RuleTable>,
    generated_path: PathBuf,
    manual_path: PathBuf,
    max_file_bytes: u64,
    outcomes: broadcast::Sender<ReloadOutcome>,
    /// Held for the duration of a reload; at most one runs at a time.
    reload_lock: Mutex<()>,
    loading: AtomicBool,
}

impl ReloadCoordinator {
    pub fn new(table: Arc<RuleTable>, config: &RulesConfig) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        Self {
            table,
            generated_path: config.generated_path.clone(),
            manual_path: config.manual_path.clone(),
            max_file_bytes: config.max_file_bytes,
            outcomes,
            reload_lock: Mutex::new(()),
            loading: AtomicBool::new(false),
        }
    }

    /// Receive every future reload outcome.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadOutcome> {
        self.outcomes.subscribe()
    }

    pub fn table(&self) -> &Arc<RuleTable> {
        &self.table
    }

    pub fn state(&self) -> CoordinatorState {
        if self.loading.load(Ordering::Acquire) {
            CoordinatorState::Loading
        } else {
            CoordinatorState::Idle
        }
    }

    /// Run one reload synchronously: load both files, then swap or reject.
    ///
    /// Blocks on file I/O; concurrent callers wait for the running reload.
    pub fn reload_now(&self, trigger: Vec<PathBuf>) -> ReloadOutcome {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.loading.store(true, Ordering::Release);
        let started = Instant::now();

        let generated = loader::load(&self.generated_path, RuleSource::Generated, self.max_file_bytes);
        let manual = loader::load(&self.manual_path, RuleSource::Manual, self.max_file_bytes);
        let status = self.apply(generated, manual);

        let outcome = ReloadOutcome {
            at: Utc::now(),
            trigger,
            elapsed_ms: started.elapsed().as_millis() as u64,
            status,
        };
        self.loading.store(false, Ordering::Release);

        log_outcome(&outcome);
        // No subscribers is fine.
        let _ = self.outcomes.send(outcome.clone());
        outcome
    }

    /// Decide accept/reject for a pair of load results as one unit.
    fn apply(
        &self,
        generated: Result<RuleSet, LoadError>,
        manual: Result<RuleSet, LoadError>,
    ) -> ReloadStatus {
        match (generated, manual) {
            (Ok(generated), Ok(manual)) => {
                let now = Utc::now();
                let sources = SourceStatus {
                    generated: Some(SourceRecord::from_set(&generated, now)),
                    manual: Some(SourceRecord::from_set(&manual, now)),
                };
                let counts = (generated.len(), manual.len());
                let generation = self.table.swap(merge(generated, manual), sources);
                ReloadStatus::Applied {
                    generation,
                    generated: counts.0,
                    manual: counts.1,
                }
            }
            (Err(g), Err(m)) => ReloadStatus::Rejected {
                reason: RejectReason::BothFailed,
                errors: vec![g, m],
            },
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => ReloadStatus::Rejected {
                reason: RejectReason::PartialFailure,
                errors: vec![e],
            },
        }
    }

    /// Serve reload requests until `shutdown` is notified.
    ///
    /// Each reload runs on the blocking pool so file reads never stall the
    /// runtime. Requests arriving mid-reload collapse into one follow-up
    /// reload. Signal shutdown with `notify_one` so it is not lost while a
    /// reload is in flight.
    pub async fn run(self: Arc<Self>, requests: Arc<ReloadRequests>, shutdown: Arc<Notify>) {
        info!("reload coordinator started");
        loop {
            tokio::select! {
                signal = requests.next() => {
                    let this = Arc::clone(&self);
                    if let Err(e) = tokio::task::spawn_blocking(move || this.reload_now(signal.paths)).await {
                        error!(error = %e, "reload task failed");
                    }
                }
                _ = shutdown.notified() => {
                    info!("reload coordinator shutting down");
                    break;
                }
            }
        }
    }
}

fn log_outcome(outcome: &ReloadOutcome) {
    match &outcome.status {
        ReloadStatus::Applied {
            generation,
            generated,
            manual,
        } => info!(
            generation = *generation,
            generated = *generated,
            manual = *manual,
            elapsed_ms = outcome.elapsed_ms,
            "rule table reloaded"
        ),
        ReloadStatus::Rejected { reason, errors } => {
            for e in errors {
                warn!(
                    reason = ?reason,
                    kind = %e.kind,
                    path = %e.path.display(),
                    error = %e.detail,
                    "rule reload rejected, keeping previous table"
                );
            }
        }
    }
}
