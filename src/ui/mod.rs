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

//! Terminal front end.

mod shell;
mod status;
mod terminal;

pub use shell::{ShellCommand, HELP_TEXT};
pub use status::StatusListener;
pub use terminal::TerminalUi;

use crate::state::AppState;

/// Show a short transient message and remember it on the state.
pub fn show_message(state: &AppState, message: &str) {
    println!("{}", message);
    state.set_last_message(message.to_string());
}
