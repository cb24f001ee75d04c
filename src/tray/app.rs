//! Main tray application

use crate::audio::OutputDeviceFactory;
use crate::controller::{user_message, ControlFlow, GuardController, MenuAction, ERROR_DIALOG_TITLE};
use crate::error::GuardError;
use crate::startup::StartupRegistrar;
use crate::tray::balloon::BalloonNotifier;
use crate::tray::dialog::show_error;
use crate::tray::icon::IconManager;
use crate::tray::menu::MenuManager;
use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use muda::MenuEvent;
use std::time::Duration;
use tracing::{error, info};
use tray_icon::{TrayIcon, TrayIconBuilder, TrayIconEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
};

/// Main tray application.
///
/// Everything runs on the thread that calls [`TrayApp::run`]; other
/// threads (the Ctrl+C handler) only post [`MenuAction`]s into the command
/// channel.
pub struct TrayApp<F: OutputDeviceFactory, R: StartupRegistrar> {
    controller: GuardController<F, R>,
    tray_icon: Option<TrayIcon>,
    menu_manager: MenuManager,
    icon_manager: IconManager,
    notifier: BalloonNotifier,
    command_tx: Sender<MenuAction>,
    command_rx: Receiver<MenuAction>,
}

impl<F: OutputDeviceFactory, R: StartupRegistrar> TrayApp<F, R> {
    /// Create a new tray application
    pub fn new(controller: GuardController<F, R>) -> Result<Self> {
        let (command_tx, command_rx) = bounded(64);

        let icon_manager = IconManager::new()?;
        let menu_manager =
            MenuManager::new(&controller.view()).context("Failed to build tray menu")?;

        Ok(Self {
            controller,
            tray_icon: None,
            menu_manager,
            icon_manager,
            notifier: BalloonNotifier::new(),
            command_tx,
            command_rx,
        })
    }

    /// Sender for posting actions from other threads
    pub fn command_sender(&self) -> Sender<MenuAction> {
        self.command_tx.clone()
    }

    /// Show the tray icon, perform launch actions, and run until exit
    pub fn run(&mut self, auto_started: bool) -> Result<()> {
        let view = self.controller.view();
        let tray_icon = TrayIconBuilder::new()
            .with_menu(Box::new(self.menu_manager.menu().clone()))
            .with_tooltip(&view.tooltip)
            .with_icon(self.icon_manager.icon_for(view.playing))
            .build()?;
        self.tray_icon = Some(tray_icon);

        let report = self.controller.launch(auto_started, &mut self.notifier);
        self.refresh()?;
        if let Some(e) = report.playback_error {
            self.report_error(&e);
        }

        let result = self.run_event_loop();

        // Hide the icon before the process goes away
        self.notifier.dismiss();
        self.tray_icon = None;
        result
    }

    fn run_event_loop(&mut self) -> Result<()> {
        info!("Tray application event loop started");

        // Windows message loop - required for tray icon and menu to work
        loop {
            unsafe {
                let mut msg: MSG = std::mem::zeroed();

                while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }

            if let Ok(TrayIconEvent::DoubleClick { .. }) = TrayIconEvent::receiver().try_recv() {
                self.command_tx.send(MenuAction::TogglePlayback)?;
            }

            if let Ok(event) = MenuEvent::receiver().try_recv() {
                if let Some(action) = self.menu_manager.get_action(event.id()) {
                    self.command_tx.send(action)?;
                }
            }

            while let Ok(action) = self.command_rx.try_recv() {
                if self.dispatch(action)? == ControlFlow::Exit {
                    info!("Tray application event loop finished");
                    return Ok(());
                }
            }

            self.notifier.poll();

            // Small sleep to avoid busy-waiting
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn dispatch(&mut self, action: MenuAction) -> Result<ControlFlow> {
        info!("Menu action: {:?}", action);

        let flow = match self.controller.handle(action) {
            Ok(flow) => flow,
            Err(e) => {
                self.report_error(&e);
                ControlFlow::Continue
            }
        };

        self.refresh()?;
        Ok(flow)
    }

    /// Push the controller's view into the menu, tooltip and icon
    fn refresh(&mut self) -> Result<()> {
        let view = self.controller.view();
        self.menu_manager.update(&view);

        if let Some(ref tray) = self.tray_icon {
            tray.set_tooltip(Some(&view.tooltip))?;
            tray.set_icon(Some(self.icon_manager.icon_for(view.playing)))?;
        }

        Ok(())
    }

    fn report_error(&self, e: &GuardError) {
        error!("{}", e);
        if let Some(message) = user_message(e) {
            show_error(ERROR_DIALOG_TITLE, &message);
        }
    }
}
