//! Application state behind the tray icon
//!
//! `GuardController` owns the playback session, the startup registrar and
//! the configuration. The tray layer only forwards user actions here and
//! renders the resulting [`TrayView`]; nothing in this module touches the
//! windowing system, so it runs unchanged under test fakes.

use crate::audio::{OutputDeviceFactory, PlaybackSession, PlaybackState};
use crate::config::GuardConfig;
use crate::error::{GuardError, Result};
use crate::notify::{startup_notification, Notifier};
use crate::startup::StartupRegistrar;
use tracing::{debug, error, info, warn};

const LABEL_START: &str = "재생 시작";
const LABEL_STOP: &str = "재생 중지";
const LABEL_AUTOSTART: &str = "시작 시 자동 실행";
const LABEL_EXIT: &str = "종료";
const STATUS_PLAYING: &str = "재생중";
const STATUS_STOPPED: &str = "중지됨";

/// Title of the modal error dialog
pub const ERROR_DIALOG_TITLE: &str = "오류";

/// Text for the modal error dialog, or `None` for errors that are only logged
pub fn user_message(error: &GuardError) -> Option<String> {
    let (prefix, detail) = match error {
        GuardError::DeviceUnavailable(detail) => ("오디오 재생 중 오류가 발생했습니다", detail),
        GuardError::DeviceTeardown(detail) => ("오디오 중지 중 오류가 발생했습니다", detail),
        GuardError::Registration(detail) => ("시작 프로그램 설정 중 오류가 발생했습니다", detail),
        _ => return None,
    };
    Some(format!("{}: {}", prefix, detail))
}

/// User actions coming from the tray icon or its menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Play/stop menu item or icon double-click
    TogglePlayback,
    /// "Run at startup" check item
    ToggleAutoStart,
    /// Exit menu item
    Exit,
}

/// Whether the event loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Exit,
}

/// Everything the tray needs to render the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayView {
    pub playing: bool,
    pub playback_label: &'static str,
    pub autostart_label: &'static str,
    pub autostart_checked: bool,
    pub exit_label: &'static str,
    pub tooltip: String,
}

/// Outcome of [`GuardController::launch`]
#[derive(Debug)]
pub struct LaunchReport {
    /// Error from the initial playback start, to be shown to the user
    pub playback_error: Option<GuardError>,
    /// Whether the launch notification was displayed
    pub notified: bool,
}

/// Owns the session and startup registration for the tray application
pub struct GuardController<F: OutputDeviceFactory, R: StartupRegistrar> {
    session: PlaybackSession<F>,
    registrar: R,
    config: GuardConfig,
    autostart_enabled: bool,
}

impl<F: OutputDeviceFactory, R: StartupRegistrar> GuardController<F, R> {
    /// Create a controller, reading the current startup registration
    pub fn new(session: PlaybackSession<F>, registrar: R, config: GuardConfig) -> Self {
        let autostart_enabled = registrar.is_enabled().unwrap_or_else(|e| {
            debug!("Treating startup registration as disabled: {}", e);
            false
        });

        Self {
            session,
            registrar,
            config,
            autostart_enabled,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub fn autostart_enabled(&self) -> bool {
        self.autostart_enabled
    }

    /// Initial actions on application start.
    ///
    /// Starts playback when configured, then shows the usage notification
    /// once unless the process was auto-started at boot.
    pub fn launch(&mut self, auto_started: bool, notifier: &mut dyn Notifier) -> LaunchReport {
        let playback_error = if self.config.play_on_launch {
            self.session.start().err()
        } else {
            None
        };

        if let Some(e) = &playback_error {
            error!("Failed to start playback on launch: {}", e);
        }

        let mut notified = false;
        if let Some(notification) =
            startup_notification(auto_started, self.config.notification_timeout())
        {
            match notifier.notify(&notification) {
                Ok(()) => notified = true,
                Err(e) => debug!("Launch notification not shown: {}", e),
            }
        } else {
            info!("Auto-started at boot, skipping launch notification");
        }

        LaunchReport {
            playback_error,
            notified,
        }
    }

    /// Apply a user action.
    ///
    /// State is consistent whether or not an error is returned; the error is
    /// only for the user to see.
    pub fn handle(&mut self, action: MenuAction) -> Result<ControlFlow> {
        match action {
            MenuAction::TogglePlayback => {
                let state = self.session.toggle()?;
                info!("Playback {:?}", state);
                Ok(ControlFlow::Continue)
            }
            MenuAction::ToggleAutoStart => {
                self.toggle_autostart()?;
                Ok(ControlFlow::Continue)
            }
            MenuAction::Exit => {
                info!("Exit application");
                if let Err(e) = self.session.stop() {
                    warn!("Playback did not stop cleanly on exit: {}", e);
                }
                Ok(ControlFlow::Exit)
            }
        }
    }

    fn toggle_autostart(&mut self) -> Result<()> {
        let result = if self.autostart_enabled {
            self.registrar.disable().map(|()| false)
        } else {
            self.registrar.enable().map(|()| true)
        };

        match result {
            Ok(enabled) => {
                self.autostart_enabled = enabled;
                info!(
                    "Run at startup {}",
                    if enabled { "enabled" } else { "disabled" }
                );
                Ok(())
            }
            Err(e) => {
                // Re-read so the check mark matches what is actually stored
                if let Ok(enabled) = self.registrar.is_enabled() {
                    self.autostart_enabled = enabled;
                }
                Err(e)
            }
        }
    }

    /// Current labels and tooltip
    pub fn view(&self) -> TrayView {
        let playing = self.session.state() == PlaybackState::Playing;
        let (playback_label, status) = if playing {
            (LABEL_STOP, STATUS_PLAYING)
        } else {
            (LABEL_START, STATUS_STOPPED)
        };

        TrayView {
            playing,
            playback_label,
            autostart_label: LABEL_AUTOSTART,
            autostart_checked: self.autostart_enabled,
            exit_label: LABEL_EXIT,
            tooltip: format!("{} ({})", crate::DISPLAY_NAME, status),
        }
    }
}
