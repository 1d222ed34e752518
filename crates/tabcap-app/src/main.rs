mod bridge;
mod persistence;
mod runtime;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tabcap_core::{Action, Clock, MemoryTabHost, Report, Settings, SystemClock};
use tracing::Level;

use bridge::{parse_trace, UserCommand};
use persistence::{FileSettingsStore, ScratchSettings, StoreError};
use runtime::AppRuntime;

const DEFAULT_SETTINGS_PAGE: &str = "chrome-extension://tabcap/options.html";

/// tabcap - keeps browser windows under a tab limit
#[derive(Parser)]
#[command(name = "tabcap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Most verbose log level written to stderr
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines trace of user actions against a simulated browser
    Replay {
        trace: PathBuf,

        /// Extension settings page excluded from the limit
        #[arg(long, value_name = "URL", default_value = DEFAULT_SETTINGS_PAGE)]
        settings_page: String,

        /// Stamp tabs with wall-clock milliseconds instead of step ticks
        #[arg(long)]
        wall_clock: bool,
    },
    /// Inspect or change the stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings
    Show,
    /// Write the complete settings file, filling in missing fields
    Install,
    /// Restore the defaults
    Reset,
    /// Merge a JSON object into the stored settings
    Set { json: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level);
    if let Err(message) = run(cli.command) {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

fn init_tracing(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::from(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Replay {
            trace,
            settings_page,
            wall_clock,
        } => replay(&trace, &settings_page, wall_clock),
        Commands::Settings { action } => settings(action),
    }
}

fn open_store() -> Result<FileSettingsStore, String> {
    FileSettingsStore::open_default()
        .map_err(|error| format!("tabcap: cannot locate settings\n  {error}"))
}

fn replay(trace: &Path, settings_page: &str, wall_clock: bool) -> Result<(), String> {
    let source = fs::read_to_string(trace)
        .map_err(|error| format!("tabcap: cannot read {}\n  {error}", trace.display()))?;
    let commands = parse_trace(&source).map_err(|error| format!("tabcap: bad trace\n  {error}"))?;
    let initial = open_store()?
        .read()
        .map_err(|error| format!("tabcap: cannot load settings\n  {error}"))?;
    let provider = ScratchSettings::new(initial)
        .map_err(|error| format!("tabcap: cannot load settings\n  {error}"))?;

    if wall_clock {
        return run_trace(commands, provider, SystemClock, settings_page);
    }
    let mut tick = 0u64;
    let clock = move || {
        tick += 1;
        tick
    };
    run_trace(commands, provider, clock, settings_page)
}

fn run_trace<C: Clock>(
    commands: Vec<UserCommand>,
    provider: ScratchSettings,
    clock: C,
    settings_page: &str,
) -> Result<(), String> {
    let mut runtime = AppRuntime::new(MemoryTabHost::default(), provider, clock, settings_page);

    for (step, command) in commands.into_iter().enumerate() {
        let step = step + 1;
        let changed = command
            .apply(runtime.host_mut())
            .map_err(|error| format!("tabcap: step {step} failed\n  {error}"))?;
        if let Some(settings) = changed {
            runtime
                .provider_mut()
                .set(settings)
                .map_err(|error| format!("tabcap: step {step} rejected\n  {error}"))?;
            runtime.settings_changed();
        }
        let reports = runtime
            .pump()
            .map_err(|error| format!("tabcap: step {step} failed\n  {error}"))?;
        for report in &reports {
            print_report(step, report);
        }
    }

    print_host(runtime.host());
    Ok(())
}

fn print_report(step: usize, report: &Report) {
    for action in &report.actions {
        let line = match action {
            Action::Closed { tab_ids } => format!("closed {}", join(tab_ids)),
            Action::GroupCreated { group_id, seed } => format!("created {group_id} from {seed}"),
            Action::Grouped { group_id, tab_ids } => {
                format!("grouped {} into {group_id}", join(tab_ids))
            }
            Action::Restored { group_id, tab_ids } => {
                format!("restored {} from {group_id}", join(tab_ids))
            }
            Action::DuplicatesClosed { kept, closed } => {
                format!("kept {kept}, closed duplicates {}", join(closed))
            }
            Action::Focused { tab_id } => format!("focused {tab_id}"),
        };
        println!("[{step}] {}: {line}", report.window_id);
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_host(host: &MemoryTabHost) {
    for window_id in host.window_ids() {
        println!("{window_id}");
        for tab in host.tabs_in(window_id) {
            let id = tab.id.map(|id| id.to_string()).unwrap_or_default();
            let url = tab.url.as_deref().unwrap_or("");
            let marker = if tab.active { " *" } else { "" };
            match tab.group_id.and_then(|group_id| host.group(group_id)) {
                Some(group) => println!("  [{}] {id} {url}{marker}", group.title),
                None => println!("  {id} {url}{marker}"),
            }
        }
    }
}

fn settings(action: SettingsAction) -> Result<(), String> {
    let mut store = open_store()?;
    let settings = match action {
        SettingsAction::Show => store.read().map_err(store_failed)?,
        SettingsAction::Install => store.install().map_err(store_failed)?,
        SettingsAction::Reset => store.reset().map_err(store_failed)?,
        SettingsAction::Set { json } => {
            let current = store.read().map_err(store_failed)?;
            let merged = merge_settings(&current, &json)
                .map_err(|error| format!("tabcap: cannot update settings\n  {error}"))?;
            let revision = store.save(merged.clone()).map_err(store_failed)?;
            tracing::info!(revision, "settings updated");
            merged.normalized()
        }
    };

    let json = serde_json::to_string_pretty(&settings)
        .map_err(|error| format!("tabcap: cannot print settings\n  {error}"))?;
    println!("{json}");
    Ok(())
}

fn store_failed(error: StoreError) -> String {
    format!("tabcap: settings store failed\n  {error}")
}

/// Overlays the fields of `patch` onto `current`.
fn merge_settings(current: &Settings, patch: &str) -> Result<Settings, String> {
    let mut merged = serde_json::to_value(current).map_err(|error| error.to_string())?;
    let patch: serde_json::Value = serde_json::from_str(patch).map_err(|error| error.to_string())?;
    let (Some(target), serde_json::Value::Object(fields)) = (merged.as_object_mut(), patch) else {
        return Err("settings must be a JSON object".to_owned());
    };
    target.extend(fields);
    serde_json::from_value(merged).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use tabcap_core::{ExceedBehavior, GroupStrategy};

    use super::*;

    #[test]
    fn merge_keeps_fields_not_mentioned() {
        let current = Settings {
            max_tabs: 4,
            ..Settings::default()
        };

        let merged = merge_settings(&current, r#"{"exceedBehavior":"prevent"}"#)
            .expect("merge should succeed");

        assert_eq!(merged.max_tabs, 4);
        assert_eq!(merged.exceed_behavior, ExceedBehavior::Prevent);
        assert_eq!(merged.group_strategy, GroupStrategy::RecentAsc);
    }

    #[test]
    fn merge_rejects_non_objects() {
        assert!(merge_settings(&Settings::default(), "[1, 2]").is_err());
        assert!(merge_settings(&Settings::default(), "{oops").is_err());
    }

    #[test]
    fn cli_parses_replay_with_log_level() {
        let cli = Cli::try_parse_from(["tabcap", "--log-level", "debug", "replay", "trace.jsonl"])
            .expect("arguments should parse");

        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(matches!(
            cli.command,
            Commands::Replay { settings_page, wall_clock: false, .. }
                if settings_page == DEFAULT_SETTINGS_PAGE
        ));
    }

    #[test]
    fn cli_parses_wall_clock_replay() {
        let cli = Cli::try_parse_from(["tabcap", "replay", "--wall-clock", "trace.jsonl"])
            .expect("arguments should parse");

        assert!(matches!(
            cli.command,
            Commands::Replay { wall_clock: true, .. }
        ));
    }
}
