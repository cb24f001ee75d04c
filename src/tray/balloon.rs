//! Balloon notification shown from a transient notification-area icon

use crate::error::{GuardError, Result};
use crate::notify::{Notification, Notifier};
use std::time::Instant;
use tracing::{debug, warn};
use windows::{
    core::w,
    Win32::{
        Foundation::HWND,
        UI::{
            Shell::{
                Shell_NotifyIconW, NIF_ICON, NIF_INFO, NIIF_INFO, NIM_ADD, NIM_DELETE,
                NOTIFYICONDATAW, NOTIFY_ICON_DATA_FLAGS,
            },
            WindowsAndMessaging::{
                CreateWindowExW, DestroyWindow, LoadIconW, HWND_MESSAGE, IDI_INFORMATION,
                WINDOW_EX_STYLE, WINDOW_STYLE,
            },
        },
    },
};

/// Icon id of the balloon entry, unique per owner window
const BALLOON_ICON_ID: u32 = 1;

/// Icon and balloon text, without a tooltip
const BALLOON_FLAGS: NOTIFY_ICON_DATA_FLAGS = NOTIFY_ICON_DATA_FLAGS(NIF_ICON.0 | NIF_INFO.0);

fn copy_wide(dest: &mut [u16], text: &str) {
    // Leave room for the terminating NUL
    let max = dest.len().saturating_sub(1);
    let mut len = 0;
    for (slot, unit) in dest.iter_mut().zip(text.encode_utf16().take(max)) {
        *slot = unit;
        len += 1;
    }
    if let Some(terminator) = dest.get_mut(len) {
        *terminator = 0;
    }
}

struct ActiveBalloon {
    window: HWND,
    dismiss_at: Instant,
}

/// Shows notifications as shell balloons and removes them after their timeout.
///
/// The balloon is owned by a message-only window so it is independent of
/// the main tray icon. The shell only shows balloons for an icon of its
/// own, so a second (information) icon sits in the notification area
/// while the balloon is up and is removed together with it.
/// [`BalloonNotifier::poll`] must be called from the event loop for the
/// timeout to take effect.
#[derive(Default)]
pub struct BalloonNotifier {
    active: Option<ActiveBalloon>,
}

impl BalloonNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dismiss the balloon once its timeout has elapsed
    pub fn poll(&mut self) {
        if let Some(active) = &self.active {
            if Instant::now() >= active.dismiss_at {
                self.dismiss();
            }
        }
    }

    /// Remove the balloon and its owner window
    pub fn dismiss(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        let data = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: active.window,
            uID: BALLOON_ICON_ID,
            ..Default::default()
        };

        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &data);
            let _ = DestroyWindow(active.window);
        }
        debug!("Notification dismissed");
    }
}

impl Notifier for BalloonNotifier {
    fn notify(&mut self, notification: &Notification) -> Result<()> {
        self.dismiss();

        unsafe {
            let window = CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                w!("STATIC"),
                w!(""),
                WINDOW_STYLE::default(),
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                None,
                None,
                None,
            )
            .map_err(|e| GuardError::Notification(format!("CreateWindowExW failed: {}", e)))?;

            let mut data = NOTIFYICONDATAW {
                cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
                hWnd: window,
                uID: BALLOON_ICON_ID,
                uFlags: BALLOON_FLAGS,
                hIcon: LoadIconW(None, IDI_INFORMATION).unwrap_or_default(),
                dwInfoFlags: NIIF_INFO,
                ..Default::default()
            };
            data.Anonymous.uTimeout = notification.timeout.as_millis().min(u32::MAX as u128) as u32;
            copy_wide(&mut data.szInfoTitle, &notification.title);
            copy_wide(&mut data.szInfo, &notification.body);

            if !Shell_NotifyIconW(NIM_ADD, &data).as_bool() {
                let _ = DestroyWindow(window);
                warn!("Shell_NotifyIconW rejected the notification");
                return Err(GuardError::Notification(
                    "Shell_NotifyIconW(NIM_ADD) failed".into(),
                ));
            }

            self.active = Some(ActiveBalloon {
                window,
                dismiss_at: Instant::now() + notification.timeout,
            });
        }

        debug!("Notification shown: {}", notification.title);
        Ok(())
    }
}

impl Drop for BalloonNotifier {
    fn drop(&mut self) {
        self.dismiss();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::UI::Shell::NIF_TIP;

    #[test]
    fn test_balloon_entry_has_no_tooltip() {
        assert_eq!(BALLOON_FLAGS.0 & NIF_TIP.0, 0);
        assert_ne!(BALLOON_FLAGS.0 & NIF_INFO.0, 0);
    }

    #[test]
    fn test_copy_wide_truncates_and_terminates() {
        let mut dest = [0xffffu16; 4];
        copy_wide(&mut dest, "abcdef");
        assert_eq!(dest, [b'a' as u16, b'b' as u16, b'c' as u16, 0]);

        let mut dest = [0xffffu16; 4];
        copy_wide(&mut dest, "a");
        assert_eq!(&dest[..2], &[b'a' as u16, 0]);
    }
}
