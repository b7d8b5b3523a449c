mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufReader};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use cli::Args;
use db2db_report::config::{self, Config};
use db2db_report::events::{self, ReplayStats};
use db2db_report::handler::ErrorHandler;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the run should exit successfully
fn run() -> Result<bool> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Load or create config
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&args.config)?;

    // Apply CLI overrides to config
    if let Some(ref log_folder) = args.log_folder {
        config.log_folder = log_folder.to_string_lossy().to_string();
    }
    if let Some(ref center) = args.center {
        config.center_name = center.clone();
    }

    if config_path.exists() {
        let missing = config::check_missing_options(&config_path);
        if !missing.is_empty() {
            eprintln!(
                "Warning: Your config is missing new options: {}",
                missing.join(", ")
            );
            eprintln!(
                "  Consider regenerating with: rm {:?} && db2db-report",
                config_path
            );
            eprintln!();
        }
    }

    let mut handler = ErrorHandler::open(&config.expanded_log_folder(), &config.center_name)?;

    let mut total = ReplayStats::default();
    for path in &args.events {
        let stats = replay_path(path, &mut handler)?;
        tracing::info!(
            source = %path.display(),
            applied = stats.applied,
            skipped = stats.skipped,
            "replayed events"
        );
        total.applied += stats.applied;
        total.skipped += stats.skipped;
    }

    let report = if args.summary {
        handler.render_summary()
    } else {
        handler.render_run_report()
    };
    print!("{}", report);

    if total.skipped > 0 {
        println!();
        println!("Skipped {} malformed event(s).", total.skipped);
    }

    handler.info(&format!(
        "Run report produced: {} error(s) from {} event(s).",
        handler.error_count(),
        total.applied
    ));

    Ok(args.no_fail || !handler.has_errors())
}

fn replay_path(path: &Path, handler: &mut ErrorHandler) -> Result<ReplayStats> {
    if path == Path::new("-") {
        return events::replay(io::stdin().lock(), "<stdin>", handler);
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open event file: {}", path.display()))?;
    events::replay(BufReader::new(file), &path.display().to_string(), handler)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
