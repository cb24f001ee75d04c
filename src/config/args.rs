//! CLI argument parsing using clap
//!
//! The tray binary needs no arguments; these flags only exist for
//! troubleshooting.

use clap::Parser;
use std::path::PathBuf;

/// Speaker Sleep Guard - keep speakers awake with a silent stream
#[derive(Parser, Debug, Default)]
#[command(name = "speaker-sleep-guard")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Show a console window and log to it
    #[arg(short, long)]
    pub debug: bool,

    /// Verbose output (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode - only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Log output to file
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Configuration file (defaults to speaker-sleep-guard.toml next to the executable)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Parse `args`, falling back to defaults when the command line is not
    /// understood. The parse error is returned for logging once logging is
    /// up, since the GUI process has no console to print it to.
    pub fn parse_lenient_from<I, T>(args: I) -> (Self, Option<clap::Error>)
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(args) => (args, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Log level from the verbose/quiet flags, falling back to `configured`
    pub fn log_level(&self, configured: &str) -> String {
        if self.quiet {
            return "error".to_string();
        }
        match self.verbose {
            0 => configured.to_string(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let args = Args::try_parse_from(["speaker-sleep-guard"]).unwrap();
        assert!(!args.debug);
        assert!(args.log.is_none());
        assert!(args.config.is_none());
        assert_eq!(args.log_level("info"), "info");
    }

    #[test]
    fn test_log_level_flags() {
        let args = Args::try_parse_from(["speaker-sleep-guard", "-d", "-vv"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.log_level("info"), "trace");

        let args = Args::try_parse_from(["speaker-sleep-guard", "-v"]).unwrap();
        assert_eq!(args.log_level("warn"), "debug");

        let args = Args::try_parse_from(["speaker-sleep-guard", "-q", "-v"]).unwrap();
        assert_eq!(args.log_level("info"), "error");
    }

    #[test]
    fn test_unquoted_path_with_space_falls_back_to_defaults() {
        // An unquoted autorun entry arrives split at the space
        let (args, err) = Args::parse_lenient_from([
            r"C:\Program",
            r"Files\Guard\speaker-sleep-guard.exe",
        ]);
        assert_eq!(
            err.map(|e| e.kind()),
            Some(clap::error::ErrorKind::UnknownArgument)
        );
        assert!(!args.debug);
        assert_eq!(args.verbose, 0);
        assert!(args.log.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_lenient_parse_accepts_valid_flags() {
        let (args, err) = Args::parse_lenient_from(["speaker-sleep-guard", "--debug"]);
        assert!(err.is_none());
        assert!(args.debug);
    }

    #[test]
    fn test_paths() {
        let args = Args::try_parse_from([
            "speaker-sleep-guard",
            "--log",
            "guard.log",
            "--config",
            "guard.toml",
        ])
        .unwrap();
        assert_eq!(args.log, Some(PathBuf::from("guard.log")));
        assert_eq!(args.config, Some(PathBuf::from("guard.toml")));
    }
}
