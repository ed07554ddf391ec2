//! Wiring of table, coordinator and watcher into one running rule engine.

use std::sync::Arc;

use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tracing::info;
use winroute_core::RulesConfig;

use crate::coordinator::{ReloadCoordinator, ReloadOutcome};
use crate::loader::Result;
use crate::matcher::Matcher;
use crate::table::RuleTable;
use crate::watcher::{ChangeWatcher, ReloadRequests};

/// Rule store plus its reload machinery, not yet watching.
pub struct RuleEngine {
    config: RulesConfig,
    table: Arc<RuleTable>,
    coordinator: Arc<ReloadCoordinator>,
}

impl RuleEngine {
    pub fn new(config: RulesConfig) -> Self {
        let table = Arc::new(RuleTable::new());
        let coordinator = Arc::new(ReloadCoordinator::new(Arc::clone(&table), &config));
        Self {
            config,
            table,
            coordinator,
        }
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn table(&self) -> Arc<RuleTable> {
        Arc::clone(&self.table)
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::new(Arc::clone(&self.table))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadOutcome> {
        self.coordinator.subscribe()
    }

    /// Load both files once, outside the watcher.
    pub fn reload_now(&self) -> ReloadOutcome {
        self.coordinator.reload_now(Vec::new())
    }

    /// Start watching, perform the initial load, and serve reloads in the background.
    ///
    /// The watcher is armed before the initial load so no change between the
    /// two is missed. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<RunningEngine> {
        let requests = Arc::new(ReloadRequests::new());
        let watcher = ChangeWatcher::start(
            &[self.config.generated_path.clone(), self.config.manual_path.clone()],
            self.config.debounce,
            Arc::clone(&requests),
        )?;

        let initial = self.reload_now();
        info!(applied = initial.is_applied(), generation = self.table.generation(), "initial rule load complete");

        let shutdown = Arc::new(Notify::new());
        let coordinator = tokio::spawn(Arc::clone(&self.coordinator).run(requests, Arc::clone(&shutdown)));

        Ok(RunningEngine {
            initial,
            _watcher: watcher,
            coordinator,
            shutdown,
        })
    }
}

/// Handle to a started engine. Dropping it stops watching.
pub struct RunningEngine {
    initial: ReloadOutcome,
    _watcher: ChangeWatcher,
    coordinator: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

impl RunningEngine {
    /// Outcome of the load performed by [`RuleEngine::start`].
    pub fn initial_outcome(&self) -> &ReloadOutcome {
        &self.initial
    }

    /// Stop the coordinator after any in-flight reload, then the watcher.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.coordinator.await {
            tracing::warn!(error = %e, "reload coordinator ended abnormally");
        }
    }
}
