//! trainpack CLI Entry Point
//!
//! Replays a scripted wizard session and keeps its draft auto-saved.
//!
//! # Usage
//!
//! ```bash
//! # Replay a session script
//! trainpack session.yaml
//!
//! # Resume from the last auto-saved draft
//! trainpack session.yaml --resume
//!
//! # Store snapshots elsewhere and save more eagerly
//! trainpack session.yaml --state-dir /tmp/packages --autosave-ms 500
//! ```

use std::env;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info, warn};

use trainpack::autosave::{AutoSaveConfig, SnapshotStore, DEFAULT_SNAPSHOT_DIR};
use trainpack::monitoring::{EventLog, FanoutObserver, LogObserver};
use trainpack::session::{run_session, Outcome, SessionReport};
use trainpack::workflow::{load_script, WorkflowState, WorkflowStore};
use trainpack::{SnapshotError, APP_NAME, VERSION};

/// Default auto-save interval in milliseconds.
const DEFAULT_AUTOSAVE_MS: u64 = 30_000;

/// Environment variable overriding the auto-save interval.
const AUTOSAVE_ENV: &str = "TRAINPACK_AUTOSAVE_MS";

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    script_path: Option<String>,
    state_dir: String,
    autosave_ms: u64,
    resume: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        let autosave_ms = env::var(AUTOSAVE_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_AUTOSAVE_MS);

        Self {
            script_path: None,
            state_dir: DEFAULT_SNAPSHOT_DIR.to_string(),
            autosave_ms,
            resume: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Training-Package Wizard Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: trainpack [OPTIONS] <SCRIPT>");
    println!();
    println!("Arguments:");
    println!("  <SCRIPT>            Path to a session script (YAML)");
    println!();
    println!("Options:");
    println!("  --state-dir PATH    Snapshot directory (default: {})", DEFAULT_SNAPSHOT_DIR);
    println!(
        "  --autosave-ms N     Auto-save interval in ms (default: {}, env: {})",
        DEFAULT_AUTOSAVE_MS, AUTOSAVE_ENV
    );
    println!("  --resume            Start from the stored draft if one exists");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  trainpack session.yaml");
    println!("  trainpack session.yaml --resume --autosave-ms 500");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--resume" => {
                config.resume = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--state-dir" => {
                i += 1;
                if i >= args.len() {
                    return Err("--state-dir requires a path argument".to_string());
                }
                config.state_dir = args[i].clone();
            }
            "--autosave-ms" => {
                i += 1;
                if i >= args.len() {
                    return Err("--autosave-ms requires a number argument".to_string());
                }
                config.autosave_ms = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid auto-save interval: {}", args[i]))?;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.script_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.script_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    if config.script_path.is_none() {
        return Err("Missing session script".to_string());
    }

    Ok(config)
}

/// Picks the starting state: the stored draft when resuming, else fresh.
fn initial_state(snapshots: &SnapshotStore, name: &str, resume: bool) -> WorkflowState {
    if !resume {
        return WorkflowState::new(name);
    }

    match snapshots.load_draft(name) {
        Ok(state) => state,
        Err(e) => {
            warn!("Could not resume draft for '{}': {}. Starting fresh.", name, e);
            WorkflowState::new(name)
        }
    }
}

/// Opens the session store, numbering past versions already published on disk.
fn open_store(
    snapshots: &SnapshotStore,
    name: &str,
    resume: bool,
) -> Result<WorkflowStore, SnapshotError> {
    let state = initial_state(snapshots, name, resume);
    let latest = snapshots.latest_published(&state.base_name)?;
    if latest > 0 {
        info!("Found published versions of '{}' up to v{}", state.base_name, latest);
    }
    Ok(WorkflowStore::from_state(state).with_published_floor(latest))
}

/// Writes every version published during the session.
fn save_published(snapshots: &SnapshotStore, store: &WorkflowStore) -> Result<(), SnapshotError> {
    save_published(&snapshots, &store)?;
    Ok(())
}

/// Prints the per-action outcome table.
fn print_report(report: &SessionReport) {
    println!();
    println!("Session '{}':", report.name.bold());

    for entry in &report.actions {
        let outcome = entry.outcome.to_string();
        let outcome = match entry.outcome {
            Outcome::Failed { .. } | Outcome::Rejected(_) => outcome.red(),
            Outcome::Passed { ref warnings } if !warnings.is_empty() => outcome.yellow(),
            Outcome::Published { .. } => outcome.cyan(),
            _ => outcome.green(),
        };
        println!("  {:>3}. {:20} {}", entry.index + 1, entry.action, outcome);
    }
}

/// Prints the final workflow state.
fn print_state(state: &WorkflowState) {
    println!();
    println!(
        "Package {} ({}) - {:.0}% complete, at step '{}'",
        state.version_label().bold(),
        state.status,
        state.progress() * 100.0,
        state.current_step
    );

    for (id, step) in state.steps.iter() {
        let status = step.status.to_string();
        let status = match step.status {
            trainpack::StepStatus::Completed => status.green(),
            trainpack::StepStatus::Error => status.red(),
            trainpack::StepStatus::InProgress => status.yellow(),
            trainpack::StepStatus::NotStarted => status.dimmed(),
        };
        println!("  {:24} {}", id.title(), status);
    }
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let script_path = config.script_path.unwrap_or_default();
    let script = load_script(&script_path)?;
    info!(
        "Script '{}' loaded: {} actions (auto-save every {} ms)",
        script.name,
        script.actions.len(),
        config.autosave_ms
    );

    let snapshots = SnapshotStore::new(&config.state_dir);
    let events = EventLog::new();

    let sink = snapshots.clone();
    let mut store = open_store(&snapshots, &script.name, config.resume)?
        .with_observer(
            FanoutObserver::new()
                .with(LogObserver::default())
                .with(events.clone()),
        )
        .with_error_handler(|e| warn!("Navigation refused: {}", e))
        .with_auto_save(AutoSaveConfig::from_millis(config.autosave_ms), move |state| {
            if let Err(e) = sink.save_draft(&state) {
                error!("Auto-save failed: {}", e);
            }
        });

    let report = run_session(&mut store, &script);

    if store.flush_auto_save() {
        info!("Flushed pending draft to {}", snapshots.dir().display());
    }

    for published in store.published_versions() {
        snapshots.save_published(published)?;
    }

    let state = store.into_state();
    if state.is_published() {
        snapshots.delete_draft(&state.base_name)?;
    }

    print_report(&report);
    print_state(&state);
    println!();
    println!("{}", events.summary());

    if report.problem_count() > 0 {
        println!(
            "{}",
            format!("{} action(s) failed or were rejected", report.problem_count()).yellow()
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
