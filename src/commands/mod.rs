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

//! LED commands and speech transcript recognition.
//!
//! The wire protocol is one byte per command: `1` turns the LED on, `0`
//! turns it off. There is no framing and no acknowledgement.

use tracing::debug;

/// Command understood by the LED controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    /// Parse from a word, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    /// Byte sent on the wire.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::On => 1,
            Self::Off => 0,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::On),
            0 => Some(Self::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// Outcome of matching a speech transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Command(LedCommand),
    /// The best guess was something other than "on" or "off".
    Unrecognized(String),
    /// The recognizer returned nothing.
    Empty,
}

/// Match recognizer results. Only the best (first) result is considered, and
/// it must be exactly "on" or "off" once lower-cased.
pub fn recognize(results: &[String]) -> SpeechOutcome {
    let Some(best) = results.first() else {
        return SpeechOutcome::Empty;
    };

    let phrase = best.to_lowercase();
    debug!("Recognizing transcript: {}", phrase);
    match phrase.as_str() {
        "on" => SpeechOutcome::Command(LedCommand::On),
        "off" => SpeechOutcome::Command(LedCommand::Off),
        _ => SpeechOutcome::Unrecognized(best.clone()),
    }
}
