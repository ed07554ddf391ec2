//! Shared fixtures for rule engine integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use winroute_core::RulesConfig;

pub struct RuleDir {
    pub dir: TempDir,
    pub config: RulesConfig,
}

impl RuleDir {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create tempdir");
        let config = RulesConfig {
            generated_path: dir.path().join("generated-rules.json"),
            manual_path: dir.path().join("manual-rules.json"),
            debounce: Duration::from_millis(100),
            ..RulesConfig::default()
        };
        Self { dir, config }
    }

    pub fn write_generated(&self, contents: &str) {
        write_atomically(&self.config.generated_path, contents);
    }

    pub fn write_manual(&self, contents: &str) {
        write_atomically(&self.config.manual_path, contents);
    }

    pub fn remove_manual(&self) {
        fs::remove_file(&self.config.manual_path).expect("remove manual file");
    }
}

/// Write to a sibling temp file, then rename over the target, as editors do.
fn write_atomically(path: &Path, contents: &str) {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).expect("write temp rule file");
    fs::rename(&tmp, path).expect("rename rule file into place");
}

/// One JSON rule record.
pub fn record(pattern: &str, kind: &str, priority: i32, workspace: i64) -> String {
    format!(
        r#"{{"pattern_rule": {{"pattern": "{}", "match_kind": "{}", "scope": "scoped", "priority": {}, "description": "{} rule"}}, "workspace": {}}}"#,
        pattern, kind, priority, pattern, workspace
    )
}

pub fn rules(records: &[String]) -> String {
    format!("[{}]", records.join(",\n"))
}
