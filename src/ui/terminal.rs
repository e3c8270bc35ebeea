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

//! Terminal rendering of the discovery flow.

use std::sync::Arc;
use tracing::debug;

use super::show_message;
use crate::bluetooth::{DiscoveryUi, RequestCode};
use crate::state::AppState;

/// Prints the discovery dialogs and records pending prompts on the state.
pub struct TerminalUi {
    state: Arc<AppState>,
}

impl TerminalUi {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl DiscoveryUi for TerminalUi {
    fn request(&mut self, code: RequestCode) {
        self.state.set_pending_request(code);
        match code {
            RequestCode::EnableBluetooth => {
                println!("Bluetooth is off. Turn it on? [y/n]");
            }
            RequestCode::DiscoveryPermission => {
                println!("Allow this application to search for devices? [y/n]");
            }
        }
    }

    fn show_progress(&mut self) {
        println!("Searching ...");
        println!("Please wait");
    }

    fn show_devices(&mut self, names: &[String]) {
        println!("Devices:");
        for (i, name) in names.iter().enumerate() {
            println!("  {}. {}", i + 1, name);
        }
        println!("Type 'select <n>' to connect.");
    }

    fn show_empty(&mut self) {
        println!("No devices found. Type 'rescan' to search again.");
    }

    fn dismiss(&mut self) {
        debug!("Dialog dismissed");
    }

    fn notify(&mut self, message: &str) {
        show_message(&self.state, message);
    }
}
