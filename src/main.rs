//! Speaker Sleep Guard system tray application
//!
//! Plays a silent stream to the default output device so the speakers
//! never fall asleep. Takes no arguments in normal use.
//!
//! Run with `--debug` to show a console window and enable log output.

// No console window; `--debug` allocates one at runtime
#![cfg_attr(windows, windows_subsystem = "windows")]

use anyhow::Result;

#[cfg(windows)]
fn main() -> Result<()> {
    let (args, parse_error) =
        speaker_sleep_guard::config::Args::parse_lenient_from(std::env::args_os());
    app::run(args, parse_error)
}

#[cfg(not(windows))]
fn main() -> Result<()> {
    anyhow::bail!("speaker-sleep-guard only runs on Windows")
}

#[cfg(windows)]
mod app {
    use anyhow::{Context, Result};
    use speaker_sleep_guard::audio::{AudioFormat, PlaybackSession, WasapiOutputFactory};
    use speaker_sleep_guard::config::{Args, GuardConfig};
    use speaker_sleep_guard::controller::{GuardController, MenuAction};
    use speaker_sleep_guard::startup::{
        launched_at_boot, process_start_time, RunKeyRegistrar, UptimeBootClock,
    };
    use speaker_sleep_guard::tray::TrayApp;
    use speaker_sleep_guard::APPLICATION_NAME;
    use tracing::{info, warn};
    use tracing_subscriber::EnvFilter;

    pub fn run(args: Args, parse_error: Option<clap::Error>) -> Result<()> {
        // In debug mode, allocate a console window for stdout/stderr
        if args.debug {
            unsafe {
                windows::Win32::System::Console::AllocConsole()?;
            }
        }

        let loaded = GuardConfig::load_default(args.config.as_deref());
        let config = loaded.as_ref().cloned().unwrap_or_default();

        init_logging(&args, &config)?;

        if args.debug {
            println!("Starting speaker-sleep-guard (debug mode)...");
        }
        if let Some(e) = parse_error {
            warn!("Ignoring command line: {}", e.to_string().trim_end());
        }
        if let Err(e) = loaded {
            warn!("{}; using default configuration", e);
        }

        let auto_started =
            launched_at_boot(process_start_time(), &UptimeBootClock, config.threshold_minutes);
        info!("Launched {}", if auto_started { "at boot" } else { "manually" });

        let registrar = RunKeyRegistrar::for_current_exe(APPLICATION_NAME)?;
        let session = PlaybackSession::new(WasapiOutputFactory, AudioFormat::SPEAKER);
        let controller = GuardController::new(session, registrar, config);

        let mut app = TrayApp::new(controller)?;

        if args.debug {
            let tx = app.command_sender();
            ctrlc::set_handler(move || {
                println!("\nReceived Ctrl+C, stopping...");
                let _ = tx.send(MenuAction::Exit);
            })
            .context("Failed to install Ctrl+C handler")?;
        }

        app.run(auto_started)
    }

    /// Logging is only installed with `--debug` or when a log file is set,
    /// since the GUI process has nowhere else to write
    fn init_logging(args: &Args, config: &GuardConfig) -> Result<()> {
        let log_file = args.log.clone().or_else(|| config.log_file());
        if !args.debug && log_file.is_none() {
            return Ok(());
        }

        let level = args.log_level(&config.log_level);
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false);

        if let Some(log_file) = log_file {
            let file = std::fs::File::create(&log_file)
                .with_context(|| format!("Failed to create log file {:?}", log_file))?;
            subscriber.with_writer(file).with_ansi(false).init();
        } else {
            subscriber.init();
        }

        Ok(())
    }
}
