//! Match engine: window facts in, highest-priority matching rule out.

use std::sync::Arc;

use winroute_core::RuleEntry;

use crate::table::RuleTable;

/// Facts about a newly created window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFacts<'a> {
    pub class: &'a str,
    pub title: &'a str,
}

impl<'a> WindowFacts<'a> {
    pub fn new(class: &'a str, title: &'a str) -> Self {
        Self { class, title }
    }
}

/// First entry in table order that matches `window`.
///
/// Entries are already priority-descending, so the scan stops at the first
/// hit; lower-priority rules that would also match are never considered.
pub fn match_window<'e>(entries: &'e [RuleEntry], window: &WindowFacts<'_>) -> Option<&'e RuleEntry> {
    entries
        .iter()
        .find(|entry| entry.rule.matches(window.class, window.title))
}

/// Query handle over a live [`RuleTable`]. Cheap to clone.
#[derive(Clone)]
pub struct Matcher {
    table: Arc<RuleTable>,
}

impl Matcher {
    pub fn new(table: Arc<RuleTable>) -> Self {
        Self { table }
    }

    /// Highest-priority rule for this window, or `None` to let the caller fall back.
    pub fn find(&self, class: &str, title: &str) -> Option<RuleEntry> {
        self.find_with_generation(class, title).1
    }

    /// Like [`find`](Self::find), also reporting the table generation consulted.
    pub fn find_with_generation(&self, class: &str, title: &str) -> (u64, Option<RuleEntry>) {
        let snapshot = self.table.snapshot();
        let window = WindowFacts::new(class, title);
        let found = match_window(&snapshot.entries, &window).cloned();
        (snapshot.generation, found)
    }
}
