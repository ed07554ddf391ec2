//! Live, priority-ordered rule table with lock-free snapshot reads.
//!
//! The published state is an immutable [`TableSnapshot`] behind an
//! [`ArcSwap`]. Readers load the current `Arc` without blocking; the writer
//! builds a complete replacement and publishes it in one store.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use winroute_core::RuleEntry;

use crate::loader::RuleSet;

/// Last successful load of one rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub path: PathBuf,
    /// False if the file was absent and contributed nothing.
    pub present: bool,
    pub entries: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SourceRecord {
    pub fn from_set(set: &RuleSet, loaded_at: DateTime<Utc>) -> Self {
        Self {
            path: set.path.clone(),
            present: set.present,
            entries: set.len(),
            loaded_at,
        }
    }
}

/// Which files contributed to the current table. `None` before the first swap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub generated: Option<SourceRecord>,
    pub manual: Option<SourceRecord>,
}

/// Immutable point-in-time view of the rule table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableSnapshot {
    /// Sorted by priority, highest first.
    pub entries: Vec<RuleEntry>,
    /// Incremented on every successful swap; 0 is the initial empty table.
    pub generation: u64,
    pub sources: SourceStatus,
}

impl TableSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct RuleTable {
    current: ArcSwap<TableSnapshot>,
    /// Serializes writers so generations stay strictly increasing.
    write_lock: Mutex<()>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTable {
    /// Empty table at generation 0.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(TableSnapshot::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// Current table. Never blocks, unaffected by later swaps.
    pub fn snapshot(&self) -> Arc<TableSnapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Sort `entries` and publish them as the new table. Returns the new generation.
    pub fn swap(&self, mut entries: Vec<RuleEntry>, sources: SourceStatus) -> u64 {
        sort_by_priority(&mut entries);

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.current.load().generation + 1;
        self.current.store(Arc::new(TableSnapshot {
            entries,
            generation,
            sources,
        }));
        generation
    }
}

/// Stable sort by priority, highest first. Equal priorities keep input order.
pub fn sort_by_priority(entries: &mut [RuleEntry]) {
    entries.sort_by(|a, b| b.priority().cmp(&a.priority()));
}

/// Merge two loaded files: generated entries, then manual entries, then sorted.
///
/// At equal priority the generated entry therefore precedes the manual one.
pub fn merge(generated: RuleSet, manual: RuleSet) -> Vec<RuleEntry> {
    let mut merged = Vec::with_capacity(generated.len() + manual.len());
    merged.extend(generated.entries);
    merged.extend(manual.entries);
    sort_by_priority(&mut merged);
    merged
}

#[cfg(test)]
mod tests {
    use std::thread;

    use winroute_core::{MatchKind, PatternRule, RuleSource, Scope};

    use super::*;

    fn entry(pattern: &str, priority: i32, workspace: u8, source: RuleSource) -> RuleEntry {
        RuleEntry {
            rule: PatternRule {
                pattern: pattern.to_string(),
                match_kind: MatchKind::ByClass,
                scope: Scope::Scoped,
                priority,
                description: format!("{} rule", pattern),
            },
            workspace,
            source,
        }
    }

    fn set(source: RuleSource, entries: Vec<RuleEntry>) -> RuleSet {
        RuleSet {
            source,
            path: PathBuf::from(format!("{}.json", source)),
            present: true,
            entries,
        }
    }

    #[test]
    fn new_table_is_empty_generation_zero() {
        let table = RuleTable::new();
        let snap = table.snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap.generation, 0);
        assert!(snap.sources.generated.is_none());
    }

    #[test]
    fn swap_sorts_and_bumps_generation() {
        let table = RuleTable::new();
        let g1 = table.swap(
            vec![
                entry("a", 1, 1, RuleSource::Generated),
                entry("b", 5, 2, RuleSource::Generated),
                entry("c", 3, 3, RuleSource::Manual),
            ],
            SourceStatus::default(),
        );
        assert_eq!(g1, 1);
        let priorities: Vec<i32> = table.snapshot().entries.iter().map(|e| e.priority()).collect();
        assert_eq!(priorities, vec![5, 3, 1]);

        let g2 = table.swap(Vec::new(), SourceStatus::default());
        assert_eq!(g2, 2);
        assert_eq!(table.generation(), 2);
    }

    #[test]
    fn old_snapshot_survives_swap() {
        let table = RuleTable::new();
        table.swap(vec![entry("a", 1, 1, RuleSource::Generated)], SourceStatus::default());
        let before = table.snapshot();
        table.swap(vec![entry("b", 1, 2, RuleSource::Generated)], SourceStatus::default());

        assert_eq!(before.entries[0].rule.pattern, "a");
        assert_eq!(table.snapshot().entries[0].rule.pattern, "b");
    }

    #[test]
    fn merge_keeps_every_entry() {
        let g = set(
            RuleSource::Generated,
            (0..7).map(|i| entry(&format!("g{}", i), i, 1, RuleSource::Generated)).collect(),
        );
        let m = set(
            RuleSource::Manual,
            (0..4).map(|i| entry(&format!("m{}", i), i * 3, 2, RuleSource::Manual)).collect(),
        );
        let merged = merge(g, m);
        assert_eq!(merged.len(), 11);
        assert_eq!(merged.iter().filter(|e| e.source == RuleSource::Manual).count(), 4);
    }

    #[test]
    fn merge_orders_by_priority_descending() {
        let g = set(
            RuleSource::Generated,
            vec![
                entry("x", -5, 1, RuleSource::Generated),
                entry("y", 240, 1, RuleSource::Generated),
                entry("z", 10, 1, RuleSource::Generated),
            ],
        );
        let m = set(
            RuleSource::Manual,
            vec![entry("w", 250, 3, RuleSource::Manual), entry("v", 0, 4, RuleSource::Manual)],
        );
        let merged = merge(g, m);
        for pair in merged.windows(2) {
            assert!(pair[0].priority() >= pair[1].priority());
        }
        assert_eq!(merged[0].rule.pattern, "w");
        assert_eq!(merged.last().unwrap().rule.pattern, "x");
    }

    #[test]
    fn equal_priority_places_generated_before_manual() {
        // Precedence is by number only: the manual rule is appended later and
        // loses ties under the stable sort.
        let g = set(RuleSource::Generated, vec![entry("Code", 240, 1, RuleSource::Generated)]);
        let m = set(RuleSource::Manual, vec![entry("Code", 240, 3, RuleSource::Manual)]);
        let merged = merge(g, m);
        assert_eq!(merged[0].source, RuleSource::Generated);
        assert_eq!(merged[1].source, RuleSource::Manual);
    }

    #[test]
    fn equal_priority_keeps_file_order() {
        let g = set(
            RuleSource::Generated,
            vec![
                entry("first", 7, 1, RuleSource::Generated),
                entry("second", 7, 2, RuleSource::Generated),
                entry("third", 7, 3, RuleSource::Generated),
            ],
        );
        let merged = merge(g, set(RuleSource::Manual, Vec::new()));
        let names: Vec<&str> = merged.iter().map(|e| e.rule.pattern.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn concurrent_readers_never_see_torn_tables() {
        // Each published table holds N copies tagged with one workspace; a torn
        // read would show two different workspaces in one snapshot.
        let table = Arc::new(RuleTable::new());
        let table_for_writer = Arc::clone(&table);

        let writer = thread::spawn(move || {
            for round in 0..500u32 {
                let ws = (round % 9 + 1) as u8;
                let entries = (0..32)
                    .map(|i| entry(&format!("r{}", i), i, ws, RuleSource::Generated))
                    .collect();
                table_for_writer.swap(entries, SourceStatus::default());
            }
        });

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    let mut last_generation = 0;
                    for _ in 0..2000 {
                        let snap = table.snapshot();
                        assert!(snap.generation >= last_generation);
                        last_generation = snap.generation;
                        if let Some(first) = snap.entries.first() {
                            assert_eq!(snap.entries.len(), 32);
                            assert!(snap.entries.iter().all(|e| e.workspace == first.workspace));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(table.generation(), 500);
    }
}
