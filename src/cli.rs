use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing::Level;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("SEGRAB_", $v)
    };
}

/// Grab the HLS video a browser is streaming: collect the `.ts` fragments seen
/// in its network log, download them and remux them into a single video file,
/// without re-encoding.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The browser performance log to read the network events from.
    ///
    /// Either a JSON array of log entries or one JSON log entry per line,
    /// each entry holding the devtools notification in its `message` field.
    /// The file is read again on every trigger.
    #[arg(long, env = arg_env!("CAPTURE"))]
    pub capture: PathBuf,

    /// The address of the page the video comes from.
    /// By default, the last page loaded according to the performance log
    #[arg(long, env = arg_env!("PAGE_URL"))]
    pub page_url: Option<String>,

    /// The path to a TOML settings file
    #[arg(long, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// Grab once right away and exit, instead of waiting for triggers
    #[arg(long, env = arg_env!("ONCE"))]
    pub once: bool,

    /// Log more. Can be repeated
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn valid_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_from_flags() {
        let parse = |args: &[&str]| {
            Args::try_parse_from(["segrab", "--capture", "perf.json"].iter().chain(args)).unwrap()
        };

        assert_eq!(parse(&[]).log_level(), Level::INFO);
        assert_eq!(parse(&["-v"]).log_level(), Level::DEBUG);
        assert_eq!(parse(&["-vv"]).log_level(), Level::TRACE);
        assert_eq!(parse(&["-q"]).log_level(), Level::WARN);
        assert!(Args::try_parse_from(["segrab", "--capture", "p", "-q", "-v"]).is_err());
    }

    #[test]
    fn capture_is_required() {
        if std::env::var_os("SEGRAB_CAPTURE").is_none() {
            assert!(Args::try_parse_from(["segrab"]).is_err());
        }
    }
}
