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

//! Bluetooth Classic constants for the LED controller link.

use std::time::Duration;
use uuid::Uuid;

/// Standard Serial Port Profile UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// RFCOMM channel used by the vendor fallback connect path.
pub const FALLBACK_RFCOMM_CHANNEL: u8 = 1;

/// Maximum number of bytes read from the link per call.
pub const READ_BUFFER_SIZE: usize = 1024;

/// How long a discovery window stays open before the fallback timer fires.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Request codes for the prompts raised by the discovery flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RequestCode {
    /// Ask the user to power on the adapter.
    EnableBluetooth = 1733,
    /// Ask the user to allow device discovery.
    DiscoveryPermission = 1734,
}

impl RequestCode {
    pub fn code(&self) -> u16 {
        *self as u16
    }
}
