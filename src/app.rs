// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shell application tying discovery, the connection controller and the
//! terminal together.

use anyhow::Result;
use std::future::pending;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::bluetooth::{
    BluetoothAdapter, BluetoothConnectionController, BluetoothManager, ConnectionMessage,
    DeviceHandle, RequestCode, RfcommConnector, ScanEvent,
};
use crate::commands::{recognize, LedCommand, SpeechOutcome};
use crate::config::Config;
use crate::state::AppState;
use crate::ui::{show_message, ShellCommand, StatusListener, TerminalUi, HELP_TEXT};

/// Text of the about dialog.
pub const ABOUT_TEXT: &str = "This application controls the LED via Bluetooth.";

/// Something the application has to react to besides user input.
#[derive(Debug)]
pub enum AppEvent {
    Scan(ScanEvent),
    Connection(ConnectionMessage),
    DeviceSelected(DeviceHandle),
}

/// The shell application.
pub struct App {
    config: Config,
    state: Arc<AppState>,
    adapter: Option<Arc<dyn BluetoothAdapter>>,
    connector: Option<Arc<dyn RfcommConnector>>,
    manager: Option<BluetoothManager<TerminalUi>>,
    controller: Option<BluetoothConnectionController<StatusListener>>,
    selected_tx: mpsc::UnboundedSender<DeviceHandle>,
    selected_rx: mpsc::UnboundedReceiver<DeviceHandle>,
}

impl App {
    /// Create the application. `adapter` and `connector` are `None` when the
    /// host has no usable Bluetooth stack.
    pub fn new(
        config: Config,
        state: Arc<AppState>,
        adapter: Option<Arc<dyn BluetoothAdapter>>,
        connector: Option<Arc<dyn RfcommConnector>>,
    ) -> Self {
        let (selected_tx, selected_rx) = mpsc::unbounded_channel();
        Self {
            config,
            state,
            adapter,
            connector,
            manager: None,
            controller: None,
            selected_tx,
            selected_rx,
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn manager(&self) -> Option<&BluetoothManager<TerminalUi>> {
        self.manager.as_ref()
    }

    pub fn controller(&self) -> Option<&BluetoothConnectionController<StatusListener>> {
        self.controller.as_ref()
    }

    /// Wait for the next discovery, connection or selection event.
    pub async fn next_event(&mut self) -> AppEvent {
        let manager = &mut self.manager;
        let controller = &mut self.controller;
        let selected = &mut self.selected_rx;

        tokio::select! {
            event = async move {
                match manager {
                    Some(manager) => manager.next_scan_event().await,
                    None => pending().await,
                }
            } => AppEvent::Scan(event),
            Some(message) = async move {
                match controller {
                    Some(controller) => controller.next_message().await,
                    None => pending().await,
                }
            } => AppEvent::Connection(message),
            Some(device) = selected.recv() => AppEvent::DeviceSelected(device),
        }
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Scan(event) => {
                if let Some(manager) = self.manager.as_mut() {
                    manager.handle_scan_event(event).await;
                }
            }
            AppEvent::Connection(message) => {
                if let Some(controller) = self.controller.as_mut() {
                    controller.handle_message(message);
                }
            }
            AppEvent::DeviceSelected(device) => {
                self.start_for_bluetooth(device).await;
                if let Some(mut manager) = self.manager.take() {
                    manager.destroy().await;
                }
            }
        }
    }

    /// Run one shell command. Returns false when the shell should exit.
    pub async fn handle_command(&mut self, command: ShellCommand) -> Result<bool> {
        match command {
            ShellCommand::Connect => {
                if self.state.has_connection() {
                    show_message(&self.state, "The connection is now established");
                } else {
                    self.connect().await?;
                }
            }
            ShellCommand::Disconnect => self.destroy_bluetooth_controller().await,
            ShellCommand::About => println!("{}", ABOUT_TEXT),
            ShellCommand::Select(index) => match self.manager.as_mut() {
                Some(manager) => {
                    if let Err(e) = manager.select(index).await {
                        show_message(&self.state, &e.to_string());
                    }
                }
                None => show_message(&self.state, "No device list is shown"),
            },
            ShellCommand::Rescan => match self.manager.as_mut() {
                Some(manager) => manager.search_again().await?,
                None => self.connect().await?,
            },
            ShellCommand::On => self.send_transcript(&["on".to_string()]).await,
            ShellCommand::Off => self.send_transcript(&["off".to_string()]).await,
            ShellCommand::Say(phrase) => self.send_transcript(&[phrase]).await,
            ShellCommand::Answer(granted) => self.answer(granted).await?,
            ShellCommand::Status => self.print_status(),
            ShellCommand::Help => println!("{}", HELP_TEXT),
            ShellCommand::Quit => return Ok(false),
            ShellCommand::Empty => {}
            ShellCommand::Unknown(line) => {
                show_message(&self.state, &format!("Unknown command '{}'. Type 'help'.", line));
            }
        }
        Ok(true)
    }

    fn new_manager(&self) -> BluetoothManager<TerminalUi> {
        let selected_tx = self.selected_tx.clone();
        BluetoothManager::with_timeout(
            self.adapter.clone(),
            TerminalUi::new(self.state.clone()),
            Box::new(move |device| {
                let _ = selected_tx.send(device);
            }),
            self.config.bluetooth.discovery_timeout(),
        )
    }

    async fn connect(&mut self) -> Result<()> {
        match self.manager.as_mut() {
            Some(manager) => manager.initialize_bluetooth(self.adapter.clone()),
            None => self.manager = Some(self.new_manager()),
        }
        let Some(manager) = self.manager.as_mut() else {
            return Ok(());
        };

        if !manager.is_enabled() {
            show_message(&self.state, "Not supported on device.");
        } else if manager.bluetooth_permission_is_failed().await {
            show_message(&self.state, "Please confirm requests.");
        } else {
            manager.start_searching().await?;
        }
        Ok(())
    }

    async fn answer(&mut self, granted: bool) -> Result<()> {
        let Some(code) = self.state.take_pending_request() else {
            show_message(&self.state, "Nothing to confirm");
            return Ok(());
        };
        let Some(manager) = self.manager.as_mut() else {
            return Ok(());
        };

        let handled = match code {
            RequestCode::EnableBluetooth => manager.handle_activity_result(code, granted).await?,
            RequestCode::DiscoveryPermission => {
                manager.handle_permissions_result(code, granted).await?
            }
        };
        if handled && !granted {
            // The manager tore itself down.
            self.manager = None;
        }
        Ok(())
    }

    async fn start_for_bluetooth(&mut self, device: DeviceHandle) {
        let (Some(adapter), Some(connector)) = (self.adapter.clone(), self.connector.clone()) else {
            warn!("Device selected without a Bluetooth stack");
            return;
        };

        if let Some(old) = self.controller.take() {
            old.destroy().await;
        }

        let controller = BluetoothConnectionController::with_read_buffer_size(
            StatusListener::new(self.state.clone()),
            adapter,
            connector,
            self.config.bluetooth.read_buffer_size,
        )
        .await;
        controller.connect(device).await;
        self.controller = Some(controller);
    }

    async fn send_transcript(&mut self, results: &[String]) {
        match recognize(results) {
            SpeechOutcome::Command(command) => self.send_command(command).await,
            SpeechOutcome::Unrecognized(phrase) => {
                info!("Unrecognized phrase: {}", phrase);
                show_message(&self.state, "just say 'off' or 'on'.");
            }
            SpeechOutcome::Empty => show_message(&self.state, "just say 'off' or 'on'."),
        }
    }

    async fn send_command(&mut self, command: LedCommand) {
        match &self.controller {
            Some(controller) => controller.send(command).await,
            None => {
                show_message(&self.state, "Reconnect");
                self.state.set_disconnected();
            }
        }
    }

    fn print_status(&self) {
        let mut line = self.state.status_line();
        if let Some(since) = self.state.get_connected_at() {
            line.push_str(&format!(" since {}", since.format("%H:%M:%S")));
        }
        println!("{}", line);
    }

    async fn destroy_bluetooth_controller(&mut self) {
        if let Some(mut manager) = self.manager.take() {
            manager.destroy().await;
        }
        if let Some(controller) = self.controller.take() {
            controller.destroy().await;
        }
        self.state.set_disconnected();
    }

    /// Tear everything down before exit.
    pub async fn shutdown(&mut self) {
        self.destroy_bluetooth_controller().await;
        if let Some(adapter) = &self.adapter {
            if let Err(e) = adapter.cancel_discovery().await {
                error!("Failed to cancel discovery: {}", e);
            }
        }
        info!("Shut down");
    }
}
