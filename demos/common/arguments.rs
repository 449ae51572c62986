use std::path::PathBuf;

use arg::{parse_args, Args};

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

// -------------------------------------------------------------------------------------------------

/// Program arguments for grainclouds demo applications.
#[derive(Args, Debug, Default)]
#[allow(unused)]
pub struct Arguments {
    #[arg(short = "i", long = "input")]
    /// Mono or stereo wav file to create grains from. By default a synthesized chord is used.
    pub input_path: Option<PathBuf>,
    #[arg(short = "o", long = "output")]
    /// Write audio output into the given wav file. By default \"grainclouds.wav\".
    pub output_path: Option<PathBuf>,
    #[arg(short = "d", long = "duration")]
    /// Length of the rendered audio in seconds. By default 10.
    pub duration: Option<u64>,
    #[arg(short = "s", long = "seed")]
    /// Seed for all random decisions, to get reproducible output.
    pub seed: Option<u64>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    pub log_level: Option<log::Level>,
}

/// Parse demo arguments and apply the log-level arg to the logger
#[allow(unused)]
pub fn parse() -> Arguments {
    // Parse args
    let args = parse_args::<Arguments>();

    create_logger(args.log_level);
    args
}

// -------------------------------------------------------------------------------------------------

/// Create default logger from arguments. Invoked from `parse`.
#[allow(unused)]
pub fn create_logger(log_level: Option<log::Level>) {
    simple_logger::SimpleLogger::new()
        .with_level(log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()
        .expect("Failed to set logger");
}
