//! Test doubles for the Bluetooth stack.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bluer::Address;
use bt_led_remote::bluetooth::{
    BluetoothAdapter, BluetoothEventListener, BoxedStream, ConnectStrategy, ConnectionMessage,
    DeviceHandle, DiscoveryEvent, RfcommConnector, FALLBACK_RFCOMM_CHANNEL, SPP_UUID,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::{mpsc, oneshot};

pub fn addr(last: u8) -> Address {
    Address::new([0x98, 0xD3, 0x31, 0x00, 0x00, last])
}

pub fn device(last: u8, name: &str) -> DeviceHandle {
    DeviceHandle::with_name(addr(last), name)
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

pub async fn next_message(rx: &mut mpsc::UnboundedReceiver<ConnectionMessage>) -> ConnectionMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a connection message")
        .expect("connection channel closed")
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ConnectionMessage>) -> Vec<ConnectionMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

pub struct MockAdapter {
    enabled: AtomicBool,
    permission: AtomicBool,
    discovery_tx: Mutex<Option<mpsc::Sender<DiscoveryEvent>>>,
    bonded: Mutex<Vec<DeviceHandle>>,
    pub start_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
}

impl MockAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(true),
            permission: AtomicBool::new(true),
            discovery_tx: Mutex::new(None),
            bonded: Mutex::new(Vec::new()),
            start_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        })
    }

    pub fn power(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn allow_discovery(&self, allowed: bool) {
        self.permission.store(allowed, Ordering::SeqCst);
    }

    pub fn set_bonded(&self, devices: Vec<DeviceHandle>) {
        *self.bonded.lock() = devices;
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    /// Push an event into the running discovery. Returns false if none runs.
    pub async fn emit(&self, event: DiscoveryEvent) -> bool {
        let tx = self.discovery_tx.lock().clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl BluetoothAdapter for MockAdapter {
    fn name(&self) -> String {
        "mock0".to_string()
    }

    async fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.power(enabled);
        Ok(())
    }

    async fn has_discovery_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn is_discovering(&self) -> bool {
        self.discovery_tx.lock().is_some()
    }

    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveryEvent>> {
        let (tx, rx) = mpsc::channel(32);
        *self.discovery_tx.lock() = Some(tx);
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn cancel_discovery(&self) -> Result<()> {
        self.discovery_tx.lock().take();
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn bonded_devices(&self) -> Result<Vec<DeviceHandle>> {
        Ok(self.bonded.lock().clone())
    }
}

/// Scripted outcome of one `open` call.
pub enum Link {
    Fail,
    /// Never completes.
    Hang,
    Open(DuplexStream),
    /// Completes with the stream once the sender fires.
    Gated(oneshot::Receiver<()>, DuplexStream),
    /// Opens, but every write fails and reads never complete.
    Broken,
}

/// Stream whose writes fail while reads stay pending.
pub struct BrokenStream;

impl AsyncRead for BrokenStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for BrokenStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "link broken")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub struct MockConnector {
    strategies: Vec<ConnectStrategy>,
    links: Mutex<HashMap<Address, VecDeque<Link>>>,
    attempts: Mutex<Vec<(Address, ConnectStrategy)>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Self::with_strategies(vec![
            ConnectStrategy::ServiceRecord(SPP_UUID),
            ConnectStrategy::Channel(FALLBACK_RFCOMM_CHANNEL),
        ])
    }

    pub fn with_strategies(strategies: Vec<ConnectStrategy>) -> Arc<Self> {
        Arc::new(Self {
            strategies,
            links: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, address: Address, link: Link) {
        self.links.lock().entry(address).or_default().push_back(link);
    }

    /// A link that opens straight away; returns the remote end.
    pub fn script_open(&self, address: Address) -> DuplexStream {
        let (local, remote) = tokio::io::duplex(1024);
        self.script(address, Link::Open(local));
        remote
    }

    pub fn attempts(&self) -> Vec<(Address, ConnectStrategy)> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl RfcommConnector for MockConnector {
    fn strategies(&self) -> Vec<ConnectStrategy> {
        self.strategies.clone()
    }

    async fn open(&self, device: &DeviceHandle, strategy: ConnectStrategy) -> Result<BoxedStream> {
        self.attempts.lock().push((device.address, strategy));
        let link = self
            .links
            .lock()
            .get_mut(&device.address)
            .and_then(|links| links.pop_front());

        match link {
            Some(Link::Open(stream)) => Ok(Box::new(stream)),
            Some(Link::Gated(gate, stream)) => {
                let _ = gate.await;
                Ok(Box::new(stream))
            }
            Some(Link::Hang) => std::future::pending().await,
            Some(Link::Broken) => Ok(Box::new(BrokenStream)),
            Some(Link::Fail) | None => Err(anyhow!("connect refused via {}", strategy)),
        }
    }
}

/// Listener that records every callback as a string.
#[derive(Default)]
pub struct RecordingListener {
    pub events: Vec<String>,
}

impl BluetoothEventListener for RecordingListener {
    fn bluetooth_connecting(&mut self) {
        self.events.push("connecting".to_string());
    }

    fn bluetooth_connected(&mut self, name: &str) {
        self.events.push(format!("connected:{}", name));
    }

    fn bluetooth_disconnect(&mut self) {
        self.events.push("disconnect".to_string());
    }

    fn bluetooth_connection_failed(&mut self) {
        self.events.push("failed".to_string());
    }

    fn bluetooth_data_transfer(&mut self, buffer: &[u8]) {
        self.events.push(format!("data:{:?}", buffer));
    }
}
