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

//! Application state management.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::bluetooth::RequestCode;

/// Connection status shown on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error => "Error",
        }
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Current connection status.
    pub connection_status: RwLock<ConnectionStatus>,

    /// Connected device name.
    pub connected_device: RwLock<Option<String>>,

    /// When the current session was opened.
    pub connected_at: RwLock<Option<DateTime<Local>>>,

    /// Prompt waiting for a yes/no answer.
    pub pending_request: RwLock<Option<RequestCode>>,

    /// Last transient message shown to the user.
    pub last_message: RwLock<Option<String>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            connection_status: RwLock::new(ConnectionStatus::Disconnected),
            connected_device: RwLock::new(None),
            connected_at: RwLock::new(None),
            pending_request: RwLock::new(None),
            last_message: RwLock::new(None),
        }
    }
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_connected(&self, device_name: String) {
        *self.connection_status.write() = ConnectionStatus::Connected;
        *self.connected_device.write() = Some(device_name);
        *self.connected_at.write() = Some(Local::now());
    }

    pub fn set_connecting(&self) {
        *self.connection_status.write() = ConnectionStatus::Connecting;
    }

    pub fn set_disconnected(&self) {
        *self.connection_status.write() = ConnectionStatus::Disconnected;
        *self.connected_device.write() = None;
        *self.connected_at.write() = None;
    }

    pub fn set_error(&self) {
        *self.connection_status.write() = ConnectionStatus::Error;
        *self.connected_device.write() = None;
        *self.connected_at.write() = None;
    }

    pub fn get_status(&self) -> ConnectionStatus {
        *self.connection_status.read()
    }

    pub fn has_connection(&self) -> bool {
        self.get_status() == ConnectionStatus::Connected
    }

    pub fn get_device_name(&self) -> Option<String> {
        self.connected_device.read().clone()
    }

    pub fn get_connected_at(&self) -> Option<DateTime<Local>> {
        *self.connected_at.read()
    }

    /// Status line text.
    pub fn status_line(&self) -> String {
        match (self.get_status(), self.get_device_name()) {
            (ConnectionStatus::Connected, Some(name)) => format!("Connected to '{}'", name),
            _ => "No connection".to_string(),
        }
    }

    pub fn set_pending_request(&self, code: RequestCode) {
        *self.pending_request.write() = Some(code);
    }

    pub fn take_pending_request(&self) -> Option<RequestCode> {
        self.pending_request.write().take()
    }

    pub fn set_last_message(&self, message: String) {
        *self.last_message.write() = Some(message);
    }

    pub fn get_last_message(&self) -> Option<String> {
        self.last_message.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let state = AppState::new();
        assert_eq!(state.status_line(), "No connection");

        state.set_connected("HC-05".to_string());
        assert!(state.has_connection());
        assert!(state.get_connected_at().is_some());
        assert_eq!(state.status_line(), "Connected to 'HC-05'");

        state.set_disconnected();
        assert!(!state.has_connection());
        assert_eq!(state.status_line(), "No connection");
    }

    #[test]
    fn test_pending_request_is_taken_once() {
        let state = AppState::new();
        state.set_pending_request(RequestCode::EnableBluetooth);
        assert_eq!(state.take_pending_request(), Some(RequestCode::EnableBluetooth));
        assert_eq!(state.take_pending_request(), None);
    }
}
