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

//! Shell command parsing.

/// Help text listing the shell commands.
pub const HELP_TEXT: &str = "\
Commands:
  connect        search for the LED controller and connect
  disconnect     drop the connection
  select <n>     connect to device <n> from the list
  rescan         search again
  on | off       switch the LED
  say <phrase>   send a spoken phrase ('on' or 'off')
  y | n          answer a pending request
  status         show the connection status
  about          about this application
  quit           exit";

/// A line typed into the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Connect,
    Disconnect,
    About,
    Select(usize),
    Rescan,
    On,
    Off,
    Say(String),
    Answer(bool),
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    /// Parse a line. `select` takes the 1-based position shown in the list.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "about" => Self::About,
            "rescan" => Self::Rescan,
            "on" => Self::On,
            "off" => Self::Off,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "y" | "yes" => Self::Answer(true),
            "n" | "no" => Self::Answer(false),
            "say" => Self::Say(rest.to_string()),
            "select" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => Self::Select(n - 1),
                _ => Self::Unknown(line.to_string()),
            },
            _ => Self::Unknown(line.to_string()),
        }
    }
}
