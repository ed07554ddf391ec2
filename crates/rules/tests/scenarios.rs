//! End-to-end reload protocol scenarios against real rule files.

mod common;

use common::{record, rules, RuleDir};
use winroute_core::RuleSource;
use winroute_rules::{LoadErrorKind, RejectReason, ReloadStatus, RuleEngine};

#[test]
fn manual_rule_with_higher_priority_routes_code_to_workspace_three() {
    let fx = RuleDir::new();
    fx.write_generated(&rules(&[record("Code", "by_class", 240, 1)]));
    fx.write_manual(&rules(&[record("Code", "by_class", 250, 3)]));

    let engine = RuleEngine::new(fx.config.clone());
    assert!(engine.reload_now().is_applied());

    let hit = engine.matcher().find("Code", "lib.rs - winroute").expect("a match");
    assert_eq!(hit.workspace, 3);
    assert_eq!(hit.source, RuleSource::Manual);
    assert_eq!(hit.rule.priority, 250);
}

#[test]
fn out_of_range_workspace_rejects_reload_and_keeps_table() {
    let fx = RuleDir::new();
    fx.write_generated(&rules(&[record("Code", "by_class", 240, 1)]));
    fx.write_manual(&rules(&[record("Slack", "by_class", 10, 4)]));

    let engine = RuleEngine::new(fx.config.clone());
    assert!(engine.reload_now().is_applied());
    let before = engine.table().snapshot();

    fx.write_manual(&rules(&[record("Slack", "by_class", 10, 12)]));
    let outcome = engine.reload_now();

    match &outcome.status {
        ReloadStatus::Rejected { reason, errors } => {
            assert_eq!(*reason, RejectReason::PartialFailure);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind, LoadErrorKind::Validation);
            assert_eq!(errors[0].path, fx.config.manual_path);
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    let after = engine.table().snapshot();
    assert_eq!(after.generation, before.generation);
    assert_eq!(after.entries, before.entries);
    assert_eq!(engine.matcher().find("Slack", "").map(|e| e.workspace), Some(4));
}

#[test]
fn malformed_manual_file_retains_previous_table() {
    let fx = RuleDir::new();
    fx.write_generated(&rules(&[record("Code", "by_class", 240, 1)]));
    fx.write_manual(&rules(&[record("kitty", "by_class", 300, 7)]));

    let engine = RuleEngine::new(fx.config.clone());
    engine.reload_now();
    let before = engine.table().snapshot();

    // A half-written save.
    fx.write_manual(r#"[{"pattern_rule": {"pattern": "kit"#);
    // Generated file changed too, but must not be applied alone.
    fx.write_generated(&rules(&[record("Code", "by_class", 240, 2)]));
    let outcome = engine.reload_now();

    assert!(!outcome.is_applied());
    assert_eq!(outcome.errors()[0].kind, LoadErrorKind::StructuralParse);
    let after = engine.table().snapshot();
    assert_eq!(after.generation, before.generation);
    assert_eq!(after.entries, before.entries);
    assert_eq!(engine.matcher().find("Code", "").map(|e| e.workspace), Some(1));
}

#[test]
fn deleting_manual_file_leaves_only_generated_rules() {
    let fx = RuleDir::new();
    fx.write_generated(&rules(&[
        record("Code", "by_class", 240, 1),
        record("firefox", "by_class", 100, 2),
    ]));
    fx.write_manual(&rules(&[record("Code", "by_class", 250, 3)]));

    let engine = RuleEngine::new(fx.config.clone());
    engine.reload_now();
    assert_eq!(engine.table().snapshot().len(), 3);

    fx.remove_manual();
    let outcome = engine.reload_now();
    assert_eq!(
        outcome.status,
        ReloadStatus::Applied {
            generation: 2,
            generated: 2,
            manual: 0
        }
    );

    let snap = engine.table().snapshot();
    assert!(snap.entries.iter().all(|e| e.source == RuleSource::Generated));
    assert!(!snap.sources.manual.as_ref().unwrap().present);
    assert_eq!(engine.matcher().find("Code", "").map(|e| e.workspace), Some(1));
}

#[test]
fn merged_table_contains_every_rule_in_priority_order() {
    let fx = RuleDir::new();
    let generated: Vec<String> = (0..20)
        .map(|i| record(&format!("gen{}", i), "by_class", (i * 37) % 11, (i % 9 + 1) as i64))
        .collect();
    let manual: Vec<String> = (0..8)
        .map(|i| record(&format!("man{}", i), "by_title_contains", (i * 5) % 11, 5))
        .collect();
    fx.write_generated(&rules(&generated));
    fx.write_manual(&rules(&manual));

    let engine = RuleEngine::new(fx.config.clone());
    assert!(engine.reload_now().is_applied());

    let snap = engine.table().snapshot();
    assert_eq!(snap.len(), 28);
    for pair in snap.entries.windows(2) {
        assert!(pair[0].rule.priority >= pair[1].rule.priority);
        if pair[0].rule.priority == pair[1].rule.priority {
            // Generated entries come first within a priority band.
            assert!(!(pair[0].source == RuleSource::Manual && pair[1].source == RuleSource::Generated));
        }
    }
}

#[test]
fn equal_priority_tie_goes_to_generated_rule() {
    let fx = RuleDir::new();
    fx.write_generated(&rules(&[record("Code", "by_class", 240, 1)]));
    fx.write_manual(&rules(&[record("Code", "by_class", 240, 3)]));

    let engine = RuleEngine::new(fx.config.clone());
    engine.reload_now();
    let hit = engine.matcher().find("Code", "").unwrap();
    assert_eq!(hit.source, RuleSource::Generated);
    assert_eq!(hit.workspace, 1);
}

#[test]
fn yaml_manual_file_merges_with_json_generated_file() {
    let mut fx = RuleDir::new();
    fx.config.manual_path = fx.dir.path().join("manual-rules.yml");
    fx.write_generated(&rules(&[record("Code", "by_class", 240, 1)]));
    fx.write_manual(
        "- pattern_rule:\n    pattern: Meet\n    match_kind: by_title_contains\n    scope: global\n    priority: 500\n    description: calls\n  workspace: 6\n",
    );

    let engine = RuleEngine::new(fx.config.clone());
    assert!(engine.reload_now().is_applied());
    assert_eq!(engine.matcher().find("Code", "Google Meet").map(|e| e.workspace), Some(6));
}
