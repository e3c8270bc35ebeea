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

//! Bluetooth LED Remote

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bt_led_remote::app::App;
use bt_led_remote::bluetooth::{self, BluetoothAdapter, RfcommConnector};
use bt_led_remote::config::Config;
use bt_led_remote::state::AppState;
use bt_led_remote::ui::{ShellCommand, HELP_TEXT};

/// Switch an Arduino LED over Bluetooth.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level for this application (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn print_prompt(prompt: &str) {
    print!("{}", prompt);
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("bt_led_remote={}", args.log_level).parse()?),
        )
        .init();

    info!("Starting Bluetooth LED Remote v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Configuration loaded");

    // A missing Bluetooth stack is reported when the user tries to connect.
    let (adapter, connector): (Option<Arc<dyn BluetoothAdapter>>, Option<Arc<dyn RfcommConnector>>) =
        match bluetooth::open_bluez(&config.bluetooth).await {
            Ok((adapter, connector)) => (
                Some(adapter as Arc<dyn BluetoothAdapter>),
                Some(connector as Arc<dyn RfcommConnector>),
            ),
            Err(e) => {
                warn!("Bluetooth unavailable: {:#}", e);
                (None, None)
            }
        };

    let prompt = config.shell.prompt.clone();
    let state = AppState::new();
    let mut app = App::new(config, state, adapter, connector);

    println!("{}", HELP_TEXT);
    print_prompt(&prompt);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        match app.handle_command(ShellCommand::parse(&line)).await {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(e) => error!("Command failed: {:#}", e),
                        }
                        print_prompt(&prompt);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
            event = app.next_event() => {
                app.handle_event(event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    app.shutdown().await;
    info!("Bluetooth LED Remote stopped");
    Ok(())
}
