//! Unified error types for speaker-sleep-guard

use thiserror::Error;

/// Main error type for speaker-sleep-guard operations
#[derive(Error, Debug)]
pub enum GuardError {
    /// No output device could be opened or initialized
    #[error("Audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Output device could not be stopped or released cleanly
    #[error("Audio output device teardown failed: {0}")]
    DeviceTeardown(String),

    /// System boot time could not be queried
    #[error("Boot time query unavailable: {0}")]
    BootQueryUnavailable(String),

    /// Startup registration could not be read or written
    #[error("Startup registration failed: {0}")]
    Registration(String),

    /// Notification could not be displayed
    #[error("Notification failed: {0}")]
    Notification(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for speaker-sleep-guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

impl GuardError {
    /// Create a device-unavailable error from any displayable cause
    pub fn device_unavailable(cause: impl std::fmt::Display) -> Self {
        Self::DeviceUnavailable(cause.to_string())
    }

    /// Create a teardown error from any displayable cause
    pub fn device_teardown(cause: impl std::fmt::Display) -> Self {
        Self::DeviceTeardown(cause.to_string())
    }

    /// Whether this error should be shown to the user in a modal dialog.
    ///
    /// Boot query and notification failures only degrade behaviour and are
    /// logged instead.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            GuardError::DeviceUnavailable(_)
                | GuardError::DeviceTeardown(_)
                | GuardError::Registration(_)
        )
    }
}
