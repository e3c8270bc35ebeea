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

//! Connection status listener.

use std::sync::Arc;
use tracing::{debug, info};

use super::show_message;
use crate::bluetooth::BluetoothEventListener;
use crate::state::AppState;

/// Updates the shared state and the status line from connection events.
pub struct StatusListener {
    state: Arc<AppState>,
}

impl StatusListener {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn print_status(&self) {
        println!("[{}]", self.state.status_line());
    }
}

impl BluetoothEventListener for StatusListener {
    fn bluetooth_connecting(&mut self) {
        self.state.set_connecting();
        show_message(&self.state, "connecting...");
    }

    fn bluetooth_connected(&mut self, name: &str) {
        info!("Bluetooth connected: {}", name);
        self.state.set_connected(name.to_string());
        show_message(&self.state, &format!("Connected to '{}'", name));
        self.print_status();
    }

    fn bluetooth_disconnect(&mut self) {
        self.state.set_disconnected();
        self.print_status();
    }

    fn bluetooth_connection_failed(&mut self) {
        self.state.set_error();
        show_message(&self.state, "connection failed");
    }

    fn bluetooth_data_transfer(&mut self, buffer: &[u8]) {
        debug!("Received {} bytes from device: {:02x?}", buffer.len(), buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionStatus;

    #[test]
    fn test_listener_updates_state() {
        let state = AppState::new();
        let mut listener = StatusListener::new(state.clone());

        listener.bluetooth_connecting();
        assert_eq!(state.get_status(), ConnectionStatus::Connecting);
        assert_eq!(state.get_last_message().as_deref(), Some("connecting..."));

        listener.bluetooth_connected("HC-05");
        assert!(state.has_connection());
        assert_eq!(state.get_last_message().as_deref(), Some("Connected to 'HC-05'"));

        listener.bluetooth_disconnect();
        assert_eq!(state.status_line(), "No connection");

        listener.bluetooth_connection_failed();
        assert_eq!(state.get_status(), ConnectionStatus::Error);
        assert_eq!(state.get_last_message().as_deref(), Some("connection failed"));
    }
}
