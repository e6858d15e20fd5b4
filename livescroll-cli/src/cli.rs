//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;
use simplelog::LevelFilter;

#[derive(Debug, Parser)]
#[command(
    name = "livescroll",
    version,
    about = "Drive a windowed grid over a synthetic dataset",
    long_about = "Loads a synthetic dataset into an in-memory source, then replays a scripted\n\
                  sequence of viewport scroll positions against a grid, reporting the resident\n\
                  window and row lifecycle events after each step."
)]
pub struct Args {
    /// Number of rows in the synthetic dataset.
    #[arg(long, default_value_t = 1_000)]
    pub rows: usize,

    /// Rows per page (overrides the config file).
    #[arg(long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// Grid configuration file (JSON).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Visible page markers for one scroll step, comma separated. Repeat for
    /// more steps.
    #[arg(long, value_name = "MARKERS")]
    pub scroll: Vec<String>,

    /// Row ids to select after scrolling, comma separated.
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub select: Vec<String>,

    /// Field to sort by once the scroll script has run.
    #[arg(long, value_name = "FIELD")]
    pub sort: Option<String>,

    /// Sort descending.
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Simulated fetch latency in milliseconds.
    #[arg(long = "latency-ms", default_value_t = 0)]
    pub latency_ms: u64,

    /// Log file path.
    #[arg(long = "log-file", value_name = "PATH", default_value = "livescroll.log")]
    pub log_file: PathBuf,

    /// Log level.
    #[arg(long = "log-level", value_enum, default_value = "info")]
    pub log_level: LogLevelArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}
