use clap::Parser;
use std::path::PathBuf;

/// Replay the error events of a lab-to-center migration run and print its report
#[derive(Parser, Debug)]
#[command(name = "db2db-report")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON-lines event file(s) to replay; `-` reads stdin
    pub events: Vec<PathBuf>,

    /// Directory for the run log (overrides config)
    #[arg(short, long)]
    pub log_folder: Option<PathBuf>,

    /// Center name used in the run log file name (overrides config)
    #[arg(long)]
    pub center: Option<String>,

    /// Print only the error and record counts
    #[arg(short, long)]
    pub summary: bool,

    /// Exit with status 0 even when errors were collected
    #[arg(long)]
    pub no_fail: bool,

    /// Show diagnostic output on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
