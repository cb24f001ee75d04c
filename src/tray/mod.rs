//! System tray front end
//!
//! Renders [`GuardController`](crate::controller::GuardController) state
//! with tray-icon/muda and forwards clicks back to it.

mod app;
mod balloon;
mod dialog;
mod icon;
mod menu;

pub use app::TrayApp;
pub use balloon::BalloonNotifier;
pub use dialog::show_error;
