//! Window placement rule data model shared by the loader, table and matcher.

use serde::{Deserialize, Serialize};

/// Lowest valid target workspace.
pub const MIN_WORKSPACE: u8 = 1;
/// Highest valid target workspace.
pub const MAX_WORKSPACE: u8 = 9;

/// Which window fact a pattern is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Exact equality against the window class.
    ByClass,
    /// Substring containment within the window title.
    ByTitleContains,
}

impl MatchKind {
    /// Names accepted in rule files.
    pub const NAMES: &'static [&'static str] = &["by_class", "by_title_contains"];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::ByClass => "by_class",
            MatchKind::ByTitleContains => "by_title_contains",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "by_class" => Some(MatchKind::ByClass),
            "by_title_contains" => Some(MatchKind::ByTitleContains),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Placement scope, carried through to the window manager untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Scoped,
    Global,
}

impl Scope {
    pub const NAMES: &'static [&'static str] = &["scoped", "global"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Scoped => "scoped",
            Scope::Global => "global",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scoped" => Some(Scope::Scoped),
            "global" => Some(Scope::Global),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which rule file an entry came from. Diagnostics only; never affects precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    Generated,
    Manual,
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            RuleSource::Generated => "generated",
            RuleSource::Manual => "manual",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    pub match_kind: MatchKind,
    pub scope: Scope,
    /// Higher evaluates first. Not unique.
    pub priority: i32,
    pub description: String,
}

impl PatternRule {
    /// Whether this rule applies to a window with the given class and title.
    pub fn matches(&self, class: &str, title: &str) -> bool {
        match self.match_kind {
            MatchKind::ByClass => self.pattern == class,
            MatchKind::ByTitleContains => title.contains(self.pattern.as_str()),
        }
    }
}

/// One row of the active rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(rename = "pattern_rule")]
    pub rule: PatternRule,
    /// Target workspace in `MIN_WORKSPACE..=MAX_WORKSPACE`.
    pub workspace: u8,
    pub source: RuleSource,
}

impl RuleEntry {
    pub fn priority(&self) -> i32 {
        self.rule.priority
    }
}
