use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default debounce window between a burst of file events and the reload.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
/// Default upper bound on a rule file's size.
pub const DEFAULT_MAX_RULE_FILE_BYTES: u64 = 1024 * 1024;

const GENERATED_FILE_NAME: &str = "generated-rules.json";
const MANUAL_FILE_NAME: &str = "manual-rules.json";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled key: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt<F>(lookup: &F, profile: &str, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed) {
            return Some(v);
        }
    }
    lookup(key)
}

fn profiled_u64<F>(lookup: &F, profile: &str, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    profiled_opt(lookup, profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn default_rules_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("winroute")
}

// ── Rules config ──────────────────────────────────────────────

/// Paths and tuning for the rule store and reload engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Machine-generated rule file, rewritten on every rebuild.
    pub generated_path: PathBuf,
    /// User-maintained rule file.
    pub manual_path: PathBuf,
    #[serde(with = "duration_ms")]
    pub debounce: Duration,
    pub max_file_bytes: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let dir = default_rules_dir();
        Self {
            profile: String::new(),
            generated_path: dir.join(GENERATED_FILE_NAME),
            manual_path: dir.join(MANUAL_FILE_NAME),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            max_file_bytes: DEFAULT_MAX_RULE_FILE_BYTES,
        }
    }
}

impl RulesConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `WINROUTE_PROFILE`. When set (e.g. `TEST`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("WINROUTE_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config from environment variables for a specific named profile.
    pub fn for_profile(profile: &str) -> Self {
        Self::from_lookup(profile, env_opt)
    }

    /// Build config for a profile from an arbitrary key lookup.
    pub fn from_lookup<F>(profile: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let defaults = Self::default();
        Self {
            profile: p.to_string(),
            generated_path: profiled_opt(&lookup, p, "WINROUTE_GENERATED_RULES")
                .map(PathBuf::from)
                .unwrap_or(defaults.generated_path),
            manual_path: profiled_opt(&lookup, p, "WINROUTE_MANUAL_RULES")
                .map(PathBuf::from)
                .unwrap_or(defaults.manual_path),
            debounce: Duration::from_millis(profiled_u64(
                &lookup,
                p,
                "WINROUTE_DEBOUNCE_MS",
                DEFAULT_DEBOUNCE_MS,
            )),
            max_file_bytes: profiled_u64(
                &lookup,
                p,
                "WINROUTE_MAX_RULE_FILE_BYTES",
                DEFAULT_MAX_RULE_FILE_BYTES,
            ),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  generated:   {}", self.generated_path.display());
        tracing::info!("  manual:      {}", self.manual_path.display());
        tracing::info!("  debounce:    {}ms", self.debounce.as_millis());
        tracing::info!("  max size:    {} bytes", self.max_file_bytes);
    }

    /// Summary suitable for machine-readable status output.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "generated_path": self.generated_path,
            "manual_path": self.manual_path,
            "debounce_ms": self.debounce.as_millis() as u64,
            "max_file_bytes": self.max_file_bytes,
        })
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
