use std::{path::PathBuf, sync::Arc};

use clap::Parser;

#[derive(Debug)]
struct Manager {
    clap_matches: Args,
}

#[derive(Debug, Parser, Clone)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Args {
    /// Sets the address for the REST API server
    #[arg(long, value_name = "IP:PORT", default_value = "0.0.0.0:6030")]
    rest_server: String,

    /// Do not start the REST API server, only sample and log.
    #[arg(long)]
    no_server: bool,

    /// Sample twice, print the dashboard as JSON and exit.
    #[arg(long)]
    once: bool,

    /// Interval between two samples, in milliseconds.
    #[arg(long, value_name = "MS", default_value = "1000", value_parser = clap::value_parser!(u64).range(100..))]
    interval_ms: u64,

    /// Trash folder to watch, overrides the settings file and the platform default.
    #[arg(long, value_name = "PATH")]
    trash_path: Option<PathBuf>,

    /// Settings file name or absolute path.
    #[arg(long, value_name = "FILE", default_value = "settings.json")]
    settings_file: String,

    /// Start from default settings, overwriting the settings file.
    #[arg(long)]
    reset: bool,

    /// Specifies the path in which the logs will be stored.
    #[arg(long, value_name = "PATH", default_value = "./logs")]
    log_path: String,

    /// Turns all log categories up to Debug, for more information check RUST_LOG env variable.
    #[arg(short, long)]
    verbose: bool,

    /// Turns all log categories up to Trace in the log file.
    #[arg(long)]
    enable_tracing_level_log_file: bool,
}

lazy_static! {
    static ref MANAGER: Arc<Manager> = Arc::new(Manager::new());
}

impl Manager {
    fn new() -> Self {
        Self {
            clap_matches: Args::parse(),
        }
    }
}

// Construct our manager, should be done inside main
pub fn init() {
    MANAGER.as_ref();
}

// Check if the verbosity parameter was used
pub fn is_verbose() -> bool {
    MANAGER.clap_matches.verbose
}

pub fn is_tracing() -> bool {
    MANAGER.clap_matches.enable_tracing_level_log_file
}

pub fn is_reset() -> bool {
    MANAGER.clap_matches.reset
}

pub fn is_once() -> bool {
    MANAGER.clap_matches.once
}

pub fn is_server_enabled() -> bool {
    !MANAGER.clap_matches.no_server
}

// Return the desired address for the REST API
pub fn server_address() -> String {
    MANAGER.clap_matches.rest_server.clone()
}

pub fn sample_interval() -> std::time::Duration {
    std::time::Duration::from_millis(MANAGER.clap_matches.interval_ms)
}

pub fn trash_path() -> Option<PathBuf> {
    MANAGER.clap_matches.trash_path.clone()
}

pub fn settings_file() -> String {
    MANAGER.clap_matches.settings_file.clone()
}

pub fn log_path() -> String {
    let log_path =
        std::fs::canonicalize(&MANAGER.clap_matches.log_path).unwrap_or_else(|_| {
            PathBuf::from(&MANAGER.clap_matches.log_path)
        });

    log_path.to_string_lossy().to_string()
}

// Return the command line used to start this application
pub fn command_line_string() -> String {
    std::env::args().collect::<Vec<String>>().join(" ")
}

// Return a clone of current Args struct
pub fn command_line() -> String {
    format!("{:#?}", MANAGER.clap_matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arguments() {
        let args = Args::try_parse_from(["host-dashboard"]).unwrap();
        assert_eq!(args.rest_server, "0.0.0.0:6030");
        assert_eq!(args.interval_ms, 1000);
        assert_eq!(args.settings_file, "settings.json");
        assert!(!args.verbose);
        assert!(!args.once);
        assert!(!args.no_server);
        assert!(args.trash_path.is_none());
    }

    #[test]
    fn custom_arguments() {
        let args = Args::try_parse_from([
            "host-dashboard",
            "--once",
            "--interval-ms",
            "250",
            "--trash-path",
            "/tmp/trash",
            "-v",
        ])
        .unwrap();
        assert!(args.once);
        assert!(args.verbose);
        assert_eq!(args.interval_ms, 250);
        assert_eq!(args.trash_path, Some(PathBuf::from("/tmp/trash")));
    }

    #[test]
    fn rejects_too_short_interval() {
        assert!(Args::try_parse_from(["host-dashboard", "--interval-ms", "10"]).is_err());
    }
}
