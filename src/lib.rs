//! speaker-sleep-guard - keep speakers awake
//!
//! System tray application that plays a silent stream to the default
//! output device so the speakers never enter their idle power state.

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod notify;
pub mod startup;
#[cfg(all(windows, feature = "tray"))]
pub mod tray;

pub use error::{GuardError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the startup registration entry
pub const APPLICATION_NAME: &str = "Speaker Sleep Guard";

/// Name shown in the tray tooltip and notifications
pub const DISPLAY_NAME: &str = "스피커 활성 유지";

/// Directory name used under the user config directory
pub const PACKAGE_DIR: &str = "speaker-sleep-guard";

/// Output sample rate in Hz
pub const AUDIO_SAMPLE_RATE: u32 = 44100;

/// Output channel count
pub const AUDIO_CHANNELS: u16 = 2;

/// How long the launch notification stays visible
pub const NOTIFICATION_TIMEOUT_MS: u64 = 5000;
