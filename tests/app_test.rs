//! End-to-end shell flow against the mock stack.

mod common;

use bt_led_remote::app::App;
use bt_led_remote::bluetooth::{
    BluetoothAdapter, DialogState, DiscoveryEvent, RequestCode, RfcommConnector,
};
use bt_led_remote::config::Config;
use bt_led_remote::state::{AppState, ConnectionStatus};
use bt_led_remote::ui::ShellCommand;
use common::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

fn app(adapter: &Arc<MockAdapter>, connector: &Arc<MockConnector>) -> App {
    App::new(
        Config::default(),
        AppState::new(),
        Some(adapter.clone() as Arc<dyn BluetoothAdapter>),
        Some(connector.clone() as Arc<dyn RfcommConnector>),
    )
}

async fn step(app: &mut App) {
    let event = tokio::time::timeout(Duration::from_secs(2), app.next_event())
        .await
        .expect("no application event");
    app.handle_event(event).await;
}

fn last_message(app: &App) -> Option<String> {
    app.state().get_last_message()
}

#[tokio::test]
async fn test_send_without_controller_asks_to_reconnect() {
    let mut app = app(&MockAdapter::new(), &MockConnector::new());

    assert!(app.handle_command(ShellCommand::On).await.unwrap());
    assert_eq!(last_message(&app).as_deref(), Some("Reconnect"));
    assert_eq!(app.state().get_status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_unknown_phrase_hints_at_commands() {
    let mut app = app(&MockAdapter::new(), &MockConnector::new());

    app.handle_command(ShellCommand::Say("purple".to_string()))
        .await
        .unwrap();
    assert_eq!(last_message(&app).as_deref(), Some("just say 'off' or 'on'."));

    app.handle_command(ShellCommand::Say(String::new()))
        .await
        .unwrap();
    assert_eq!(last_message(&app).as_deref(), Some("just say 'off' or 'on'."));
}

#[tokio::test]
async fn test_connect_without_adapter() {
    let mut app = App::new(Config::default(), AppState::new(), None, None);

    app.handle_command(ShellCommand::Connect).await.unwrap();
    assert_eq!(last_message(&app).as_deref(), Some("Not supported on device."));
    assert!(!app.manager().is_some_and(|m| m.is_discovering()));
}

#[tokio::test]
async fn test_connect_when_already_connected() {
    let adapter = MockAdapter::new();
    let mut app = app(&adapter, &MockConnector::new());
    app.state().set_connected("HC-05".to_string());

    app.handle_command(ShellCommand::Connect).await.unwrap();
    assert_eq!(
        last_message(&app).as_deref(),
        Some("The connection is now established")
    );
    assert_eq!(adapter.starts(), 0);
}

#[tokio::test]
async fn test_enable_prompt_then_search() {
    let adapter = MockAdapter::new();
    adapter.power(false);
    let mut app = app(&adapter, &MockConnector::new());

    app.handle_command(ShellCommand::Connect).await.unwrap();
    assert_eq!(last_message(&app).as_deref(), Some("Please confirm requests."));
    assert_eq!(
        *app.state().pending_request.read(),
        Some(RequestCode::EnableBluetooth)
    );

    app.handle_command(ShellCommand::Answer(true)).await.unwrap();
    assert!(adapter.is_enabled().await);
    assert_eq!(adapter.starts(), 1);
    assert!(app.manager().is_some_and(|m| m.is_discovering()));
}

#[tokio::test]
async fn test_enable_prompt_denied() {
    let adapter = MockAdapter::new();
    adapter.power(false);
    let mut app = app(&adapter, &MockConnector::new());

    app.handle_command(ShellCommand::Connect).await.unwrap();
    app.handle_command(ShellCommand::Answer(false)).await.unwrap();

    assert!(app.manager().is_none());
    assert_eq!(
        last_message(&app).as_deref(),
        Some("The request to use Bluetooth was rejected")
    );

    app.handle_command(ShellCommand::Answer(true)).await.unwrap();
    assert_eq!(last_message(&app).as_deref(), Some("Nothing to confirm"));
}

#[tokio::test]
async fn test_discover_select_connect_and_switch() {
    let adapter = MockAdapter::new();
    let connector = MockConnector::new();
    let mut app = app(&adapter, &connector);

    app.handle_command(ShellCommand::Connect).await.unwrap();
    assert!(app.manager().is_some_and(|m| m.is_discovering()));

    adapter
        .emit(DiscoveryEvent::DeviceFound(device(1, "HC-05")))
        .await;
    adapter.emit(DiscoveryEvent::Finished).await;
    step(&mut app).await;
    step(&mut app).await;
    assert_eq!(app.manager().map(|m| m.dialog()), Some(DialogState::Picker));

    let mut remote = connector.script_open(addr(1));
    app.handle_command(ShellCommand::Select(0)).await.unwrap();

    // Selection hands over to the controller and drops the manager.
    step(&mut app).await;
    assert!(app.manager().is_none());
    assert!(app.controller().is_some());

    for _ in 0..10 {
        if app.state().has_connection() {
            break;
        }
        step(&mut app).await;
    }
    assert!(app.state().has_connection());
    assert_eq!(app.state().status_line(), "Connected to 'HC-05'");
    assert_eq!(last_message(&app).as_deref(), Some("Connected to 'HC-05'"));

    app.handle_command(ShellCommand::On).await.unwrap();
    app.handle_command(ShellCommand::Say("Off".to_string()))
        .await
        .unwrap();
    let mut buf = [0u8; 2];
    tokio::time::timeout(Duration::from_secs(2), remote.read_exact(&mut buf))
        .await
        .expect("no bytes written")
        .unwrap();
    assert_eq!(buf, [1, 0]);

    app.handle_command(ShellCommand::Disconnect).await.unwrap();
    assert!(app.controller().is_none());
    assert_eq!(app.state().status_line(), "No connection");
}

#[tokio::test]
async fn test_quit_stops_the_shell() {
    let mut app = app(&MockAdapter::new(), &MockConnector::new());
    assert!(!app.handle_command(ShellCommand::Quit).await.unwrap());
    app.shutdown().await;
}
