//! winroute: window placement rule store.
//!
//! `watch` keeps the rule table live and prints every reload outcome as a
//! JSON line for the notification collaborator. The other subcommands load
//! the rule files once and report.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use winroute_core::config::load_dotenv;
use winroute_core::RulesConfig;
use winroute_rules::report::{find_shadowed, list_entries, validate_files, ListRow};
use winroute_rules::{ReloadOutcome, RuleEngine};

// ── CLI ─────────────────────────────────────────────────────────────

/// Window placement rules: hot-reloading rule store and tooling.
#[derive(Parser, Debug)]
#[command(name = "winroute", version, about)]
struct Cli {
    /// Config profile; `{PROFILE}_`-prefixed env keys take precedence.
    #[arg(long, env = "WINROUTE_PROFILE", global = true)]
    profile: Option<String>,

    /// Machine-generated rule file (overrides WINROUTE_GENERATED_RULES).
    #[arg(long, global = true)]
    generated: Option<PathBuf>,

    /// User-maintained rule file (overrides WINROUTE_MANUAL_RULES).
    #[arg(long, global = true)]
    manual: Option<PathBuf>,

    /// Debounce window in milliseconds (overrides WINROUTE_DEBOUNCE_MS).
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch both rule files and print reload outcomes as JSON lines.
    Watch,
    /// Print the merged rule table in evaluation order.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Load both rule files and report errors; exits non-zero on failure.
    Validate,
    /// Show which rule a window would be routed by.
    Match {
        #[arg(long)]
        class: String,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// List rules that can never be selected.
    Shadows,
    /// Print the resolved configuration as JSON.
    Config,
}

impl Cli {
    fn config(&self) -> RulesConfig {
        let mut config = RulesConfig::for_profile(self.profile.as_deref().unwrap_or(""));
        if let Some(p) = &self.generated {
            config.generated_path = p.clone();
        }
        if let Some(p) = &self.manual {
            config.manual_path = p.clone();
        }
        if let Some(ms) = self.debounce_ms {
            config.debounce = Duration::from_millis(ms);
        }
        config
    }
}

// ── Commands ────────────────────────────────────────────────────────

async fn watch(config: RulesConfig) -> anyhow::Result<()> {
    config.log_summary();
    let engine = RuleEngine::new(config);
    // Subscribe first so the initial load is reported too.
    let mut outcomes = engine.subscribe();
    let running = engine.start()?;

    forward_outcomes(&mut outcomes, tokio::signal::ctrl_c(), print_json).await?;

    running.shutdown().await;
    Ok(())
}

/// Emit outcomes until `interrupt` resolves or the channel closes.
///
/// `interrupt` is created once by the caller and polled across iterations so
/// a signal arriving between two outcomes is not lost.
async fn forward_outcomes<I, F>(
    outcomes: &mut broadcast::Receiver<ReloadOutcome>,
    interrupt: I,
    mut emit: F,
) -> anyhow::Result<()>
where
    I: Future,
    F: FnMut(&ReloadOutcome) -> anyhow::Result<()>,
{
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            received = outcomes.recv() => match received {
                Ok(outcome) => emit(&outcome)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "reload outcome subscriber lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut interrupt => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// Load once; fail with the load errors if the table could not be built.
fn load_once(config: RulesConfig) -> anyhow::Result<RuleEngine> {
    let engine = RuleEngine::new(config);
    let outcome = engine.reload_now();
    if !outcome.is_applied() {
        for e in outcome.errors() {
            eprintln!("error: {}", e);
        }
        bail!("rule files could not be loaded");
    }
    Ok(engine)
}

fn list(config: RulesConfig, json: bool) -> anyhow::Result<()> {
    let engine = load_once(config)?;
    let snapshot = engine.table().snapshot();
    let rows = list_entries(&snapshot.entries);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in &rows {
        println!("{}", format_row(row));
    }
    println!("{} rules (generation {})", rows.len(), snapshot.generation);
    Ok(())
}

fn validate(config: RulesConfig) -> anyhow::Result<()> {
    let reports = validate_files(&config);
    for r in &reports {
        match &r.error {
            None if !r.present => println!("ok    {:<9} {} (absent, no rules)", r.source, r.path.display()),
            None => println!("ok    {:<9} {} ({} rules)", r.source, r.path.display(), r.rules),
            Some(e) => println!("FAIL  {:<9} {}", r.source, e),
        }
    }
    if reports.iter().any(|r| !r.is_valid()) {
        bail!("rule validation failed");
    }
    Ok(())
}

fn match_window(config: RulesConfig, class: &str, title: &str) -> anyhow::Result<()> {
    let engine = load_once(config)?;
    match engine.matcher().find(class, title) {
        Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
        None => println!("no match"),
    }
    Ok(())
}

fn shadows(config: RulesConfig) -> anyhow::Result<()> {
    let engine = load_once(config)?;
    let snapshot = engine.table().snapshot();
    let shadows = find_shadowed(&snapshot.entries);
    for s in &shadows {
        println!("{}", format_row(&s.shadowed));
        println!("    shadowed by: {}", format_row(&s.by));
    }
    println!("{} shadowed rules", shadows.len());
    Ok(())
}

fn format_row(row: &ListRow) -> String {
    format!(
        "{:>3}  {:<9} {:>6}  {:<17} ws{}  {:<6}  {}  ({})",
        row.position,
        row.source,
        row.priority,
        row.match_kind,
        row.workspace,
        row.scope,
        row.pattern,
        row.description
    )
}

fn print_json(outcome: &ReloadOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(outcome)?);
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Command::Watch => watch(config).await,
        Command::List { json } => list(config, json),
        Command::Validate => validate(config),
        Command::Match { ref class, ref title } => match_window(config, class, title),
        Command::Shadows => shadows(config),
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.summary())?);
            Ok(())
        }
    }
}
