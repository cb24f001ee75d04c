//! Menu management for tray application

use crate::controller::{MenuAction, TrayView};
use muda::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem};
use std::collections::HashMap;

/// Context menu: play/stop, run at startup, exit
pub struct MenuManager {
    menu: Menu,
    playback_item: MenuItem,
    autostart_item: CheckMenuItem,
    actions: HashMap<MenuId, MenuAction>,
}

impl MenuManager {
    /// Build the menu for the given state
    pub fn new(view: &TrayView) -> Result<Self, muda::Error> {
        let menu = Menu::new();
        let mut actions = HashMap::new();

        let playback_item = MenuItem::new(view.playback_label, true, None);
        actions.insert(playback_item.id().clone(), MenuAction::TogglePlayback);
        menu.append(&playback_item)?;

        let autostart_item =
            CheckMenuItem::new(view.autostart_label, true, view.autostart_checked, None);
        actions.insert(autostart_item.id().clone(), MenuAction::ToggleAutoStart);
        menu.append(&autostart_item)?;

        menu.append(&PredefinedMenuItem::separator())?;

        let exit_item = MenuItem::new(view.exit_label, true, None);
        actions.insert(exit_item.id().clone(), MenuAction::Exit);
        menu.append(&exit_item)?;

        Ok(Self {
            menu,
            playback_item,
            autostart_item,
            actions,
        })
    }

    /// Get the menu to attach to the tray icon
    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Get action for a menu ID
    pub fn get_action(&self, id: &MenuId) -> Option<MenuAction> {
        self.actions.get(id).copied()
    }

    /// Sync item text and check state with the controller.
    ///
    /// The check item flips itself when clicked, so it is always reset from
    /// the view, including after a failed registry write.
    pub fn update(&self, view: &TrayView) {
        self.playback_item.set_text(view.playback_label);
        self.autostart_item.set_checked(view.autostart_checked);
    }
}
