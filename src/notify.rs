//! One-shot informational notification shown on manual launch

use crate::error::Result;
use std::time::Duration;

/// Title shown in the launch notification
pub const NOTIFICATION_TITLE: &str = crate::DISPLAY_NAME;

/// Usage hint shown in the launch notification
pub const NOTIFICATION_BODY: &str =
    "트레이 아이콘을 더블클릭하여 재생/중지하거나 오른쪽 클릭하여 메뉴를 사용하세요.";

/// A transient, auto-dismissing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub timeout: Duration,
}

/// Displays notifications to the user
pub trait Notifier {
    fn notify(&mut self, notification: &Notification) -> Result<()>;
}

/// The launch notification, or `None` when the process was auto-started at
/// boot and should stay quiet
pub fn startup_notification(auto_started: bool, timeout: Duration) -> Option<Notification> {
    if auto_started {
        return None;
    }

    Some(Notification {
        title: NOTIFICATION_TITLE.to_string(),
        body: NOTIFICATION_BODY.to_string(),
        timeout,
    })
}
