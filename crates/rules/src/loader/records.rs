//! Record-level validation: untyped document values into typed [`RuleEntry`] rows.

use std::fmt;

use serde_json::{Map, Value};
use winroute_core::{MatchKind, PatternRule, RuleEntry, RuleSource, Scope, MAX_WORKSPACE, MIN_WORKSPACE};

use super::suggest::closest;

/// A single invalid field within a rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    /// JSON-path-like location, e.g. `"[3].pattern_rule.scope"`.
    pub path: String,
    pub message: String,
    /// Optional "did you mean" suggestion.
    pub suggestion: Option<String>,
}

impl RecordError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(s) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", s)?;
        }
        Ok(())
    }
}

type RecordResult<T> = std::result::Result<T, RecordError>;

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Validate every record of an already-parsed sequence.
///
/// Stops at the first invalid record; the caller discards the whole file.
pub(super) fn parse_records(items: &[Value], source: RuleSource) -> RecordResult<Vec<RuleEntry>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_record(item, index, source))
        .collect()
}

fn parse_record(item: &Value, index: usize, source: RuleSource) -> RecordResult<RuleEntry> {
    let at = format!("[{}]", index);
    let record = expect_object(item, &at)?;

    let rule_at = format!("{}.pattern_rule", at);
    let rule = expect_object(required(record, "pattern_rule", &at)?, &rule_at)?;

    let pattern = non_empty_string(rule, "pattern", &rule_at)?;
    // Absent match_kind is inferred as a class rule.
    let match_kind = match rule.get("match_kind") {
        None | Some(Value::Null) => MatchKind::ByClass,
        Some(v) => enum_value(v, &format!("{}.match_kind", rule_at), MatchKind::NAMES, MatchKind::parse)?,
    };
    let scope = enum_value(
        required(rule, "scope", &rule_at)?,
        &format!("{}.scope", rule_at),
        Scope::NAMES,
        Scope::parse,
    )?;
    let priority = integer_in(
        required(rule, "priority", &rule_at)?,
        &format!("{}.priority", rule_at),
        i64::from(i32::MIN),
        i64::from(i32::MAX),
    )?;
    let description = non_empty_string(rule, "description", &rule_at)?;

    let ws_at = format!("{}.workspace", at);
    let workspace = integer_in(
        required(record, "workspace", &at)?,
        &ws_at,
        i64::from(MIN_WORKSPACE),
        i64::from(MAX_WORKSPACE),
    )?;

    Ok(RuleEntry {
        rule: PatternRule {
            pattern,
            match_kind,
            scope,
            priority: priority as i32,
            description,
        },
        workspace: workspace as u8,
        source,
    })
}

fn expect_object<'a>(v: &'a Value, at: &str) -> RecordResult<&'a Map<String, Value>> {
    v.as_object()
        .ok_or_else(|| RecordError::new(at, format!("expected a mapping, found {}", type_name(v))))
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str, at: &str) -> RecordResult<&'a Value> {
    match obj.get(key) {
        Some(Value::Null) | None => Err(RecordError::new(
            format!("{}.{}", at, key),
            "required field is missing",
        )),
        Some(v) => Ok(v),
    }
}

fn non_empty_string(obj: &Map<String, Value>, key: &str, at: &str) -> RecordResult<String> {
    let path = format!("{}.{}", at, key);
    let v = required(obj, key, at)?;
    let s = v
        .as_str()
        .ok_or_else(|| RecordError::new(&path, format!("expected a string, found {}", type_name(v))))?;
    if s.trim().is_empty() {
        return Err(RecordError::new(path, "must not be empty"));
    }
    Ok(s.to_string())
}

fn integer_in(v: &Value, path: &str, min: i64, max: i64) -> RecordResult<i64> {
    let n = v
        .as_i64()
        .ok_or_else(|| RecordError::new(path, format!("expected an integer, found {}", describe(v))))?;
    if n < min || n > max {
        return Err(RecordError::new(
            path,
            format!("{} is out of range {}..={}", n, min, max),
        ));
    }
    Ok(n)
}

fn enum_value<T>(v: &Value, path: &str, names: &[&str], parse: fn(&str) -> Option<T>) -> RecordResult<T> {
    let s = v
        .as_str()
        .ok_or_else(|| RecordError::new(path, format!("expected a string, found {}", type_name(v))))?;
    parse(s).ok_or_else(|| RecordError {
        path: path.to_string(),
        message: format!("unrecognised value '{}', expected one of: {}", s, names.join(", ")),
        suggestion: closest(s, names).map(str::to_string),
    })
}

fn describe(v: &Value) -> String {
    match v {
        Value::Number(n) => format!("number {}", n),
        other => type_name(other).to_string(),
    }
}
