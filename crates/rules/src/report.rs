//! Read-only views over a table snapshot for listing and validation tooling.

use std::path::PathBuf;

use serde::Serialize;
use winroute_core::{MatchKind, RuleEntry, RuleSource, RulesConfig, Scope};

use crate::loader::{self, LoadError};

/// One row of a "list rules" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRow {
    /// Zero-based position in evaluation order.
    pub position: usize,
    pub source: RuleSource,
    pub priority: i32,
    pub match_kind: MatchKind,
    pub pattern: String,
    pub workspace: u8,
    pub scope: Scope,
    pub description: String,
}

pub fn list_entries(entries: &[RuleEntry]) -> Vec<ListRow> {
    entries
        .iter()
        .enumerate()
        .map(|(position, e)| ListRow {
            position,
            source: e.source,
            priority: e.rule.priority,
            match_kind: e.rule.match_kind,
            pattern: e.rule.pattern.clone(),
            workspace: e.workspace,
            scope: e.rule.scope,
            description: e.rule.description.clone(),
        })
        .collect()
}

/// A rule that can never be selected because an earlier rule always wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shadow {
    pub shadowed: ListRow,
    pub by: ListRow,
}

/// Find rules fully shadowed by an earlier rule of the same kind.
///
/// Class rules are shadowed by an earlier identical pattern; title rules by
/// an earlier pattern contained in theirs (every title matching the later
/// rule also matches the earlier one). Only the first shadowing rule is
/// reported.
pub fn find_shadowed(entries: &[RuleEntry]) -> Vec<Shadow> {
    let rows = list_entries(entries);
    let mut shadows = Vec::new();

    for (i, later) in entries.iter().enumerate() {
        let winner = entries[..i].iter().position(|earlier| {
            earlier.rule.match_kind == later.rule.match_kind
                && match later.rule.match_kind {
                    MatchKind::ByClass => earlier.rule.pattern == later.rule.pattern,
                    MatchKind::ByTitleContains => later.rule.pattern.contains(earlier.rule.pattern.as_str()),
                }
        });
        if let Some(j) = winner {
            shadows.push(Shadow {
                shadowed: rows[i].clone(),
                by: rows[j].clone(),
            });
        }
    }

    shadows
}

/// Load result for one file, independent of any live table.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: RuleSource,
    pub path: PathBuf,
    pub present: bool,
    pub rules: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LoadError>,
}

impl FileReport {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Load both configured files and report on each without touching a table.
pub fn validate_files(config: &RulesConfig) -> Vec<FileReport> {
    [
        (RuleSource::Generated, &config.generated_path),
        (RuleSource::Manual, &config.manual_path),
    ]
    .into_iter()
    .map(|(source, path)| match loader::load(path, source, config.max_file_bytes) {
        Ok(set) => FileReport {
            source,
            path: path.clone(),
            present: set.present,
            rules: set.len(),
            error: None,
        },
        Err(e) => FileReport {
            source,
            path: path.clone(),
            present: true,
            rules: 0,
            error: Some(e),
        },
    })
    .collect()
}
