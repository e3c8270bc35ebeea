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

//! Connection state machine for a single RFCOMM link.
//!
//! One worker task runs per connect attempt and one per connected session.
//! Workers never call back into the owner; every transition and every chunk
//! of inbound data is published as a [`ConnectionMessage`] on an unbounded
//! channel, in the order the transitions happened.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::device::DeviceHandle;
use super::platform::{BluetoothAdapter, BoxedStream, RfcommConnector};

/// State of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing running.
    None,
    /// Idle and ready for a new connect.
    Listening,
    /// A connect attempt is in flight.
    Connecting,
    /// A session is open.
    Connected,
    /// The last connect attempt failed.
    Failed,
}

impl ConnectionState {
    /// Numeric state code.
    pub fn code(&self) -> i8 {
        match self {
            Self::Failed => -1,
            Self::None => 0,
            Self::Listening => 1,
            Self::Connecting => 2,
            Self::Connected => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Listening => "listening",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

/// Messages published by a connection to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMessage {
    /// The state changed.
    StateChanged(ConnectionState),
    /// Bytes arrived from the remote device.
    DataReady(Vec<u8>),
    /// The device a session was just opened with. Always sent before the
    /// matching `StateChanged(Connected)`.
    DeviceObject(DeviceHandle),
}

struct Worker {
    id: u64,
    cancel: CancellationToken,
}

impl Worker {
    fn cancel(self) {
        self.cancel.cancel();
    }
}

struct Session {
    worker: Worker,
    writer: Arc<Mutex<WriteHalf<BoxedStream>>>,
}

struct Inner {
    state: ConnectionState,
    next_id: u64,
    connect: Option<Worker>,
    session: Option<Session>,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn owns_connect(&self, id: u64) -> bool {
        self.connect.as_ref().map(|w| w.id) == Some(id)
    }

    fn owns_session(&self, id: u64) -> bool {
        self.session.as_ref().map(|s| s.worker.id) == Some(id)
    }

    fn cancel_workers(&mut self) {
        if let Some(worker) = self.connect.take() {
            debug!("Cancelling connect attempt {}", worker.id);
            worker.cancel();
        }
        if let Some(session) = self.session.take() {
            debug!("Cancelling session {}", session.worker.id);
            session.worker.cancel();
        }
    }
}

struct Shared {
    adapter: Arc<dyn BluetoothAdapter>,
    connector: Arc<dyn RfcommConnector>,
    events: mpsc::UnboundedSender<ConnectionMessage>,
    read_buffer_size: usize,
    inner: Mutex<Inner>,
}

/// Bluetooth connection driving the connect and session workers.
#[derive(Clone)]
pub struct BluetoothConnection {
    shared: Arc<Shared>,
}

impl BluetoothConnection {
    /// Create a connection that publishes to `events`.
    pub fn new(
        adapter: Arc<dyn BluetoothAdapter>,
        connector: Arc<dyn RfcommConnector>,
        events: mpsc::UnboundedSender<ConnectionMessage>,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                adapter,
                connector,
                events,
                read_buffer_size: read_buffer_size.max(1),
                inner: Mutex::new(Inner {
                    state: ConnectionState::None,
                    next_id: 0,
                    connect: None,
                    session: None,
                }),
            }),
        }
    }

    /// Current state.
    pub async fn state(&self) -> ConnectionState {
        self.shared.inner.lock().await.state
    }

    /// Whether a connect attempt or a session is still held.
    pub async fn has_workers(&self) -> bool {
        let inner = self.shared.inner.lock().await;
        inner.connect.is_some() || inner.session.is_some()
    }

    /// Start connecting to `device`, replacing any attempt or session in progress.
    pub async fn connect(&self, device: DeviceHandle) {
        let mut inner = self.shared.inner.lock().await;
        info!("Connecting to {}", device);

        // Outside of Connecting the slot is already empty.
        if let Some(worker) = inner.connect.take() {
            debug!("Replacing connect attempt {}", worker.id);
            worker.cancel();
        }
        if let Some(session) = inner.session.take() {
            session.worker.cancel();
        }

        let id = inner.next_id();
        let cancel = CancellationToken::new();
        tokio::spawn(Shared::run_connect(
            self.shared.clone(),
            id,
            device,
            cancel.clone(),
        ));
        inner.connect = Some(Worker { id, cancel });

        self.shared.set_state(&mut inner, ConnectionState::Connecting);
    }

    /// Write to the open session. Does nothing unless connected.
    pub async fn write(&self, bytes: &[u8]) {
        let writer = {
            let inner = self.shared.inner.lock().await;
            if inner.state != ConnectionState::Connected {
                debug!("Write ignored in state {}", inner.state.as_str());
                return;
            }
            match &inner.session {
                Some(session) => session.writer.clone(),
                None => return,
            }
        };

        let mut writer = writer.lock().await;
        if let Err(e) = writer.write_all(bytes).await {
            error!("Write failed: {}", e);
            return;
        }
        if let Err(e) = writer.flush().await {
            error!("Flush failed: {}", e);
            return;
        }
        debug!("Wrote {} bytes", bytes.len());
    }

    /// Drop any workers and go back to listening if the adapter is on.
    pub async fn connection_start(&self) {
        let mut inner = self.shared.inner.lock().await;
        self.shared.start_locked(&mut inner).await;
    }

    /// Drop any workers and report `None`.
    pub async fn connection_stop(&self) {
        let mut inner = self.shared.inner.lock().await;
        self.shared.stop_locked(&mut inner, true);
    }
}

impl Shared {
    fn emit(&self, message: ConnectionMessage) {
        if self.events.send(message).is_err() {
            debug!("Connection message dropped, no receiver");
        }
    }

    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        if inner.state == state {
            return;
        }
        debug!(
            "Connection state {} -> {}",
            inner.state.as_str(),
            state.as_str()
        );
        inner.state = state;
        self.emit(ConnectionMessage::StateChanged(state));
    }

    async fn start_locked(&self, inner: &mut Inner) {
        inner.cancel_workers();
        if self.adapter.is_enabled().await {
            self.set_state(inner, ConnectionState::Listening);
        } else {
            debug!("Adapter {} is off, not listening", self.adapter.name());
        }
    }

    fn stop_locked(&self, inner: &mut Inner, report: bool) {
        inner.cancel_workers();
        if report {
            self.set_state(inner, ConnectionState::None);
        }
    }

    async fn run_connect(
        self: Arc<Self>,
        id: u64,
        device: DeviceHandle,
        cancel: CancellationToken,
    ) {
        if let Err(e) = self.adapter.cancel_discovery().await {
            warn!("Failed to cancel discovery: {}", e);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Connect attempt {} cancelled", id);
                return;
            }
            result = self.open_link(&device) => result,
        };

        match result {
            Ok(stream) => self.connected(id, device, stream).await,
            Err(e) => {
                warn!("Connection to {} failed: {:#}", device, e);
                self.connect_failed(id).await;
            }
        }
    }

    /// Try each strategy the connector supports until one opens a link.
    async fn open_link(&self, device: &DeviceHandle) -> Result<BoxedStream> {
        let mut last_error = anyhow!("No connect strategy available");

        for strategy in self.connector.strategies() {
            match self.connector.open(device, strategy).await {
                Ok(stream) => {
                    info!("Connected to {} via {}", device, strategy);
                    return Ok(stream);
                }
                Err(e) => {
                    warn!("Connect via {} failed: {:#}", strategy, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn connect_failed(&self, id: u64) {
        let mut inner = self.inner.lock().await;
        if !inner.owns_connect(id) {
            debug!("Ignoring failure of superseded attempt {}", id);
            return;
        }
        inner.connect = None;

        self.set_state(&mut inner, ConnectionState::Failed);
        self.start_locked(&mut inner).await;
    }

    async fn connected(self: Arc<Self>, id: u64, device: DeviceHandle, stream: BoxedStream) {
        let mut inner = self.inner.lock().await;
        if !inner.owns_connect(id) {
            debug!("Dropping link from superseded attempt {}", id);
            return;
        }
        inner.connect = None;
        self.stop_locked(&mut inner, false);

        let (reader, writer) = tokio::io::split(stream);
        let session_id = inner.next_id();
        let cancel = CancellationToken::new();
        tokio::spawn(self.clone().run_session(session_id, reader, cancel.clone()));
        inner.session = Some(Session {
            worker: Worker {
                id: session_id,
                cancel,
            },
            writer: Arc::new(Mutex::new(writer)),
        });

        self.emit(ConnectionMessage::DeviceObject(device));
        self.set_state(&mut inner, ConnectionState::Connected);
    }

    async fn run_session(
        self: Arc<Self>,
        id: u64,
        mut reader: ReadHalf<BoxedStream>,
        cancel: CancellationToken,
    ) {
        info!("Session {} started", id);
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Session {} stopped", id);
                    return;
                }
                read = reader.read(&mut buf) => read,
            };

            match read {
                Ok(0) => {
                    info!("Connection closed by remote");
                    break;
                }
                Ok(n) => {
                    debug!("Received {} bytes", n);
                    let inner = self.inner.lock().await;
                    if !inner.owns_session(id) {
                        return;
                    }
                    self.emit(ConnectionMessage::DataReady(buf[..n].to_vec()));
                }
                Err(e) => {
                    error!("Read error: {}", e);
                    break;
                }
            }
        }

        self.connection_lost(id).await;
    }

    async fn connection_lost(&self, id: u64) {
        let mut inner = self.inner.lock().await;
        if !inner.owns_session(id) {
            return;
        }
        inner.session = None;

        self.set_state(&mut inner, ConnectionState::None);
        self.start_locked(&mut inner).await;
    }
}
