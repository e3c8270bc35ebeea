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

//! Bluetooth communication module.
//!
//! Discovers the LED controller, opens an RFCOMM link to it and reports the
//! link state back to the shell.

pub mod connection;
pub mod constants;
pub mod controller;
pub mod device;
pub mod manager;
pub mod platform;

pub use connection::{BluetoothConnection, ConnectionMessage, ConnectionState};
pub use constants::{RequestCode, DISCOVERY_TIMEOUT, FALLBACK_RFCOMM_CHANNEL, READ_BUFFER_SIZE, SPP_UUID};
pub use controller::{BluetoothConnectionController, BluetoothEventListener};
pub use device::DeviceHandle;
pub use manager::{BluetoothManager, DeviceSelected, DialogState, DiscoveryUi, ScanEvent};
pub use platform::{
    open_bluez, BluetoothAdapter, BluezAdapter, BluezConnector, BoxedStream, ConnectStrategy,
    DiscoveryEvent, RfcommConnector, SerialStream,
};
