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

//! Decodes connection messages into listener callbacks.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::{BluetoothConnection, ConnectionMessage, ConnectionState};
use super::constants::READ_BUFFER_SIZE;
use super::device::DeviceHandle;
use super::platform::{BluetoothAdapter, RfcommConnector};
use crate::commands::LedCommand;

/// Receives decoded connection events on the owner's task.
pub trait BluetoothEventListener {
    /// A connect attempt started.
    fn bluetooth_connecting(&mut self);
    /// A session is open with the named device.
    fn bluetooth_connected(&mut self, name: &str);
    /// The link is down (stopped, lost, or listening again).
    fn bluetooth_disconnect(&mut self);
    /// The connect attempt failed.
    fn bluetooth_connection_failed(&mut self);
    /// Bytes arrived from the device.
    fn bluetooth_data_transfer(&mut self, buffer: &[u8]);
}

/// Owns a [`BluetoothConnection`] and feeds its messages to a listener.
pub struct BluetoothConnectionController<L: BluetoothEventListener> {
    connection: BluetoothConnection,
    messages: mpsc::UnboundedReceiver<ConnectionMessage>,
    listener: L,
    device: Option<DeviceHandle>,
}

impl<L: BluetoothEventListener> BluetoothConnectionController<L> {
    /// Create a controller and put its connection into listening mode.
    pub async fn new(
        listener: L,
        adapter: Arc<dyn BluetoothAdapter>,
        connector: Arc<dyn RfcommConnector>,
    ) -> Self {
        Self::with_read_buffer_size(listener, adapter, connector, READ_BUFFER_SIZE).await
    }

    pub async fn with_read_buffer_size(
        listener: L,
        adapter: Arc<dyn BluetoothAdapter>,
        connector: Arc<dyn RfcommConnector>,
        read_buffer_size: usize,
    ) -> Self {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let connection = BluetoothConnection::new(adapter, connector, message_tx, read_buffer_size);
        connection.connection_start().await;

        Self {
            connection,
            messages: message_rx,
            listener,
            device: None,
        }
    }

    pub fn connection(&self) -> &BluetoothConnection {
        &self.connection
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Device of the open session, once its Connected state was delivered.
    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    pub async fn connect(&self, device: DeviceHandle) {
        self.connection.connect(device).await;
    }

    pub async fn write(&self, bytes: &[u8]) {
        self.connection.write(bytes).await;
    }

    /// Write a single byte.
    pub async fn write_value(&self, value: u8) {
        self.write(&[value]).await;
    }

    /// Send an LED command.
    pub async fn send(&self, command: LedCommand) {
        info!("Sending {} command", command.as_str());
        self.write_value(command.as_byte()).await;
    }

    /// Wait for the next message from the connection.
    pub async fn next_message(&mut self) -> Option<ConnectionMessage> {
        self.messages.recv().await
    }

    /// Deliver one message to the listener.
    pub fn handle_message(&mut self, message: ConnectionMessage) {
        match message {
            ConnectionMessage::StateChanged(state) => match state {
                ConnectionState::None | ConnectionState::Listening => {
                    self.device = None;
                    self.listener.bluetooth_disconnect();
                }
                ConnectionState::Connected => match &self.device {
                    Some(device) => {
                        let name = device.display_name();
                        self.listener.bluetooth_connected(&name);
                    }
                    None => warn!("Connected without a device, callback skipped"),
                },
                ConnectionState::Connecting => self.listener.bluetooth_connecting(),
                ConnectionState::Failed => {
                    self.device = None;
                    self.listener.bluetooth_connection_failed();
                }
            },
            ConnectionMessage::DataReady(buffer) => {
                self.listener.bluetooth_data_transfer(&buffer);
            }
            ConnectionMessage::DeviceObject(device) => {
                debug!("Session device: {}", device);
                self.device = Some(device);
            }
        }
    }

    /// Wait for one message and deliver it. Returns false once the channel is closed.
    pub async fn pump(&mut self) -> bool {
        match self.next_message().await {
            Some(message) => {
                self.handle_message(message);
                true
            }
            None => false,
        }
    }

    /// Deliver every message already queued. Returns how many were delivered.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(message) = self.messages.try_recv() {
            self.handle_message(message);
            delivered += 1;
        }
        delivered
    }

    /// Stop the connection. No further events reach the listener.
    pub async fn destroy(mut self) -> L {
        self.device = None;
        self.messages.close();
        self.connection.connection_stop().await;
        info!("Bluetooth controller destroyed");
        self.listener
    }
}
