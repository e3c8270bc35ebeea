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

//! Device discovery and selection.
//!
//! The manager checks the adapter preconditions, runs a discovery window
//! bounded by a fallback timer, merges in the bonded devices and hands the
//! user's pick to a [`DeviceSelected`] callback.

use anyhow::{anyhow, Result};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tracing::{debug, info, warn};

use super::constants::{RequestCode, DISCOVERY_TIMEOUT};
use super::device::DeviceHandle;
use super::platform::{BluetoothAdapter, DiscoveryEvent};

/// Callback invoked with the device the user picked.
pub type DeviceSelected = Box<dyn FnMut(DeviceHandle) + Send>;

/// Front end for the discovery flow.
pub trait DiscoveryUi: Send {
    /// Ask the user to grant `code`; the answer comes back through
    /// [`BluetoothManager::handle_activity_result`] or
    /// [`BluetoothManager::handle_permissions_result`].
    fn request(&mut self, code: RequestCode);
    /// Show a modal "searching" indicator.
    fn show_progress(&mut self);
    /// Show the selectable device list.
    fn show_devices(&mut self, names: &[String]);
    /// Show the empty state with a search-again action.
    fn show_empty(&mut self);
    /// Hide whatever is shown.
    fn dismiss(&mut self);
    /// Show a short transient message.
    fn notify(&mut self, message: &str);
}

/// What the discovery UI currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Hidden,
    Progress,
    Picker,
    Empty,
}

/// Event observed while a discovery window is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    DeviceFound(DeviceHandle),
    /// The stack reported the end of the discovery.
    Finished,
    /// The fallback timer fired first.
    TimedOut,
}

struct DiscoveryWindow {
    events: mpsc::Receiver<DiscoveryEvent>,
    deadline: Pin<Box<Sleep>>,
}

/// Drives discovery and device selection.
pub struct BluetoothManager<U: DiscoveryUi> {
    adapter: Option<Arc<dyn BluetoothAdapter>>,
    ui: U,
    on_selected: DeviceSelected,
    devices: Vec<DeviceHandle>,
    dialog: DialogState,
    window: Option<DiscoveryWindow>,
    discovery_timeout: Duration,
}

impl<U: DiscoveryUi> BluetoothManager<U> {
    pub fn new(adapter: Option<Arc<dyn BluetoothAdapter>>, ui: U, on_selected: DeviceSelected) -> Self {
        Self::with_timeout(adapter, ui, on_selected, DISCOVERY_TIMEOUT)
    }

    pub fn with_timeout(
        adapter: Option<Arc<dyn BluetoothAdapter>>,
        ui: U,
        on_selected: DeviceSelected,
        discovery_timeout: Duration,
    ) -> Self {
        let mut manager = Self {
            adapter: None,
            ui,
            on_selected,
            devices: Vec::new(),
            dialog: DialogState::Hidden,
            window: None,
            discovery_timeout,
        };
        manager.initialize_bluetooth(adapter);
        manager
    }

    /// Reset the result list and take a fresh adapter reference.
    pub fn initialize_bluetooth(&mut self, adapter: Option<Arc<dyn BluetoothAdapter>>) {
        self.devices.clear();
        if adapter.is_none() {
            warn!("No Bluetooth adapter available");
        }
        self.adapter = adapter;
    }

    /// Whether an adapter is present.
    pub fn is_enabled(&self) -> bool {
        self.adapter.is_some()
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn devices(&self) -> &[DeviceHandle] {
        &self.devices
    }

    pub fn dialog(&self) -> DialogState {
        self.dialog
    }

    /// Whether a discovery window is open.
    pub fn is_discovering(&self) -> bool {
        self.window.is_some()
    }

    /// Ask for whatever is missing before a discovery can run.
    ///
    /// Returns true when a request was raised; the flow resumes from the
    /// matching result handler.
    pub async fn bluetooth_permission_is_failed(&mut self) -> bool {
        let Some(adapter) = self.adapter.clone() else {
            return true;
        };

        if !adapter.is_enabled().await {
            info!("Adapter is off, requesting enable");
            self.ui.request(RequestCode::EnableBluetooth);
            return true;
        }
        if !adapter.has_discovery_permission().await {
            info!("Discovery permission missing, requesting it");
            self.ui.request(RequestCode::DiscoveryPermission);
            return true;
        }
        false
    }

    /// Open a discovery window.
    pub async fn start_searching(&mut self) -> Result<()> {
        let Some(adapter) = self.adapter.clone() else {
            return Ok(());
        };
        if self.bluetooth_permission_is_failed().await {
            return Ok(());
        }

        self.devices.clear();
        self.close_window();
        self.ui.show_progress();
        self.dialog = DialogState::Progress;

        if adapter.is_discovering().await {
            adapter.cancel_discovery().await?;
        }

        let events = match adapter.start_discovery().await {
            Ok(events) => events,
            Err(e) => {
                self.close_window();
                self.hide_dialog();
                return Err(e);
            }
        };
        self.window = Some(DiscoveryWindow {
            events,
            deadline: Box::pin(tokio::time::sleep(self.discovery_timeout)),
        });

        info!(
            "Searching for devices ({}s fallback)",
            self.discovery_timeout.as_secs()
        );
        Ok(())
    }

    /// Wait for the next scan event. Never resolves while no window is open.
    pub async fn next_scan_event(&mut self) -> ScanEvent {
        let Some(window) = self.window.as_mut() else {
            return std::future::pending().await;
        };

        tokio::select! {
            event = window.events.recv() => match event {
                Some(DiscoveryEvent::DeviceFound(device)) => ScanEvent::DeviceFound(device),
                Some(DiscoveryEvent::Finished) | None => ScanEvent::Finished,
            },
            _ = window.deadline.as_mut() => ScanEvent::TimedOut,
        }
    }

    pub async fn handle_scan_event(&mut self, event: ScanEvent) {
        if self.window.is_none() {
            debug!("Scan event after the window closed: {:?}", event);
            return;
        }

        match event {
            ScanEvent::DeviceFound(device) => {
                debug!("Adding {}", device);
                self.devices.push(device);
            }
            ScanEvent::Finished => {
                info!("Discovery finished");
                self.finish_discovery().await;
            }
            ScanEvent::TimedOut => {
                info!("Discovery timed out");
                self.finish_discovery().await;
            }
        }
    }

    async fn finish_discovery(&mut self) {
        self.close_window();
        self.hide_dialog();

        if let Some(adapter) = &self.adapter {
            // BlueZ keeps the inquiry running until it is told to stop.
            if let Err(e) = adapter.cancel_discovery().await {
                warn!("Failed to cancel discovery: {}", e);
            }
            match adapter.bonded_devices().await {
                Ok(bonded) => self.devices.extend(bonded),
                Err(e) => warn!("Failed to list bonded devices: {}", e),
            }
        }

        if self.devices.is_empty() {
            info!("No devices found");
            self.ui.show_empty();
            self.dialog = DialogState::Empty;
        } else {
            let names: Vec<String> = self.devices.iter().map(|d| d.display_name()).collect();
            info!("{} devices available", names.len());
            self.ui.show_devices(&names);
            self.dialog = DialogState::Picker;
        }
    }

    /// Pick the device at `index` in the shown list.
    pub async fn select(&mut self, index: usize) -> Result<()> {
        if self.dialog != DialogState::Picker {
            return Err(anyhow!("No device list is shown"));
        }
        let device = self
            .devices
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("No device at position {}", index + 1))?;

        if let Some(adapter) = &self.adapter {
            if let Err(e) = adapter.cancel_discovery().await {
                warn!("Failed to cancel discovery: {}", e);
            }
        }
        self.hide_dialog();

        info!("Selected {}", device);
        (self.on_selected)(device);
        Ok(())
    }

    /// Search again from the empty state (or any other).
    pub async fn search_again(&mut self) -> Result<()> {
        self.hide_dialog();
        self.start_searching().await
    }

    /// Result of an [`RequestCode::EnableBluetooth`] request.
    pub async fn handle_activity_result(&mut self, code: RequestCode, granted: bool) -> Result<bool> {
        if code != RequestCode::EnableBluetooth {
            return Ok(false);
        }

        if granted {
            if let Some(adapter) = &self.adapter {
                adapter.set_enabled(true).await?;
            }
            self.start_searching().await?;
        } else {
            self.ui.notify("The request to use Bluetooth was rejected");
            self.destroy().await;
        }
        Ok(true)
    }

    /// Result of a [`RequestCode::DiscoveryPermission`] request.
    pub async fn handle_permissions_result(&mut self, code: RequestCode, granted: bool) -> Result<bool> {
        if code != RequestCode::DiscoveryPermission {
            return Ok(false);
        }

        if granted {
            self.start_searching().await?;
        } else {
            self.ui.notify("Please confirm the requested permission.");
            self.destroy().await;
        }
        Ok(true)
    }

    /// Close the window, hide the dialog and release the adapter.
    pub async fn destroy(&mut self) {
        if self.window.is_some() {
            if let Some(adapter) = &self.adapter {
                if let Err(e) = adapter.cancel_discovery().await {
                    warn!("Failed to cancel discovery: {}", e);
                }
            }
        }
        self.close_window();
        self.hide_dialog();
        self.adapter = None;
        self.devices.clear();
        debug!("Bluetooth manager destroyed");
    }

    fn close_window(&mut self) {
        // Dropping the window drops the receiver and the fallback timer.
        self.window = None;
    }

    fn hide_dialog(&mut self) {
        if self.dialog != DialogState::Hidden {
            self.ui.dismiss();
            self.dialog = DialogState::Hidden;
        }
    }
}
