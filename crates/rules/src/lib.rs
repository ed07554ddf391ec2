//! Window placement rule store with hot reload.
//!
//! This crate provides:
//! - Rule file loading and validation (JSON or YAML), all-or-nothing per file
//! - A priority-ordered rule table published as lock-free snapshots
//! - A `notify` watcher with debouncing over the generated and manual rule files
//! - A reload coordinator that swaps or rejects both files as one unit
//! - First-match window matching and listing/shadow reports

pub mod coordinator;
pub mod engine;
pub mod loader;
pub mod matcher;
pub mod report;
pub mod table;
pub mod watcher;

pub use coordinator::{ReloadCoordinator, ReloadOutcome, ReloadStatus, RejectReason};
pub use engine::{RuleEngine, RunningEngine};
pub use loader::{LoadError, LoadErrorKind, RuleError, RuleSet};
pub use matcher::{match_window, Matcher, WindowFacts};
pub use table::{RuleTable, TableSnapshot};
pub use watcher::{ChangeSignal, ChangeWatcher, ReloadRequests};
