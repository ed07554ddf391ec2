//! [`load`]: one rule file path in, one validated [`RuleSet`] out.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use winroute_core::{RuleEntry, RuleSource};

use super::error::{LoadError, LoadErrorKind};
use super::records::parse_records;

/// On-disk encoding of a rule file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Json,
    Yaml,
}

impl RuleFormat {
    /// `.yml` / `.yaml` are YAML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"))
            .unwrap_or(false);
        if is_yaml {
            RuleFormat::Yaml
        } else {
            RuleFormat::Json
        }
    }
}

/// Validated contents of one rule file.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub source: RuleSource,
    pub path: PathBuf,
    /// False when the file did not exist (an empty, valid contribution).
    pub present: bool,
    /// Entries in file order.
    pub entries: Vec<RuleEntry>,
}

impl RuleSet {
    fn absent(path: &Path, source: RuleSource) -> Self {
        Self {
            source,
            path: path.to_path_buf(),
            present: false,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load and validate a rule file.
///
/// A missing file yields an empty set. Any unreadable, malformed or invalid
/// content fails the whole file; no partial sets are ever returned.
pub fn load(path: &Path, source: RuleSource, max_bytes: u64) -> Result<RuleSet, LoadError> {
    let contents = match read_bounded(path, max_bytes)? {
        Some(c) => c,
        None => {
            debug!(path = %path.display(), source = %source, "rule file absent, treating as empty");
            return Ok(RuleSet::absent(path, source));
        }
    };

    let items = parse_document(&contents, RuleFormat::from_path(path))
        .map_err(|detail| LoadError::new(LoadErrorKind::StructuralParse, path, detail))?;

    let entries = parse_records(&items, source)
        .map_err(|e| LoadError::new(LoadErrorKind::Validation, path, e.to_string()))?;

    debug!(path = %path.display(), source = %source, rules = entries.len(), "loaded rule file");
    Ok(RuleSet {
        source,
        path: path.to_path_buf(),
        present: true,
        entries,
    })
}

/// Read the file, refusing anything over `max_bytes`. `Ok(None)` means absent.
fn read_bounded(path: &Path, max_bytes: u64) -> Result<Option<String>, LoadError> {
    let fs_err = |e: io::Error| LoadError::new(LoadErrorKind::Filesystem, path, e.to_string());

    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(fs_err(e)),
    };
    if meta.is_dir() {
        return Err(LoadError::new(LoadErrorKind::Filesystem, path, "path is a directory"));
    }
    if meta.len() > max_bytes {
        return Err(LoadError::new(
            LoadErrorKind::Filesystem,
            path,
            format!("file is {} bytes, limit is {}", meta.len(), max_bytes),
        ));
    }

    // Removed between stat and open: same as never present.
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(fs_err(e)),
    };

    let mut bytes = Vec::with_capacity(meta.len() as usize);
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(fs_err)?;
    if bytes.len() as u64 > max_bytes {
        return Err(LoadError::new(
            LoadErrorKind::Filesystem,
            path,
            format!("file grew past the {} byte limit while reading", max_bytes),
        ));
    }

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| LoadError::new(LoadErrorKind::StructuralParse, path, format!("not valid UTF-8: {}", e)))
}

/// Parse raw text into the top-level record sequence.
fn parse_document(contents: &str, format: RuleFormat) -> Result<Vec<Value>, String> {
    // A zero-length file is almost always a writer caught mid-save.
    if contents.trim().is_empty() {
        return Err("file is empty".to_string());
    }

    let doc: Value = match format {
        RuleFormat::Json => serde_json::from_str(contents).map_err(|e| format!("JSON parse error: {}", e))?,
        RuleFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(contents).map_err(|e| format!("YAML parse error: {}", e))?;
            serde_json::to_value(yaml).map_err(|e| format!("unsupported YAML content: {}", e))?
        }
    };

    match doc {
        Value::Array(items) => Ok(items),
        other => Err(format!(
            "expected a top-level sequence of rule records, found {}",
            match other {
                Value::Object(_) => "a mapping",
                Value::String(_) => "a string",
                Value::Number(_) => "a number",
                Value::Bool(_) => "a boolean",
                _ => "null",
            }
        )),
    }
}
