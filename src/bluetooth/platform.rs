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

//! Host Bluetooth stack seam.
//!
//! The connection and discovery logic only talk to [`BluetoothAdapter`] and
//! [`RfcommConnector`]. The BlueZ implementations below back them with `bluer`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bluer::rfcomm::{Profile, Role, SocketAddr, Stream};
use bluer::{Adapter, AdapterEvent, DiscoveryFilter, DiscoveryTransport, Session};
use futures::{pin_mut, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::constants::SPP_UUID;
use super::device::DeviceHandle;
use crate::config::BluetoothConfig;

/// Byte stream carried over an RFCOMM link.
pub trait SerialStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> SerialStream for T {}

/// Boxed link stream handed from the connector to a session.
pub type BoxedStream = Box<dyn SerialStream>;

/// Events produced while a discovery is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A device answered the inquiry.
    DeviceFound(DeviceHandle),
    /// The stack ended the discovery on its own.
    Finished,
}

/// Ways of opening an RFCOMM link to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStrategy {
    /// Resolve the channel through the device's SDP record for this service.
    ServiceRecord(Uuid),
    /// Connect straight to a fixed RFCOMM channel.
    Channel(u8),
}

impl std::fmt::Display for ConnectStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceRecord(uuid) => write!(f, "service record {}", uuid),
            Self::Channel(channel) => write!(f, "RFCOMM channel {}", channel),
        }
    }
}

/// Local Bluetooth adapter.
#[async_trait]
pub trait BluetoothAdapter: Send + Sync {
    /// Adapter name, for logging.
    fn name(&self) -> String;

    /// Whether the adapter is powered.
    async fn is_enabled(&self) -> bool;

    /// Power the adapter on or off.
    async fn set_enabled(&self, enabled: bool) -> Result<()>;

    /// Whether this process may run a device discovery.
    async fn has_discovery_permission(&self) -> bool;

    /// Whether a discovery is currently running.
    async fn is_discovering(&self) -> bool;

    /// Start a discovery; events arrive on the returned receiver.
    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveryEvent>>;

    /// Stop any running discovery.
    async fn cancel_discovery(&self) -> Result<()>;

    /// Devices the adapter has already paired with.
    async fn bonded_devices(&self) -> Result<Vec<DeviceHandle>>;
}

/// Opens RFCOMM links.
#[async_trait]
pub trait RfcommConnector: Send + Sync {
    /// Strategies this connector supports, in the order they should be tried.
    fn strategies(&self) -> Vec<ConnectStrategy>;

    /// Open a link to `device` using `strategy`.
    async fn open(&self, device: &DeviceHandle, strategy: ConnectStrategy) -> Result<BoxedStream>;
}

/// Open the BlueZ adapter and connector described by `config`.
pub async fn open_bluez(config: &BluetoothConfig) -> Result<(Arc<BluezAdapter>, Arc<BluezConnector>)> {
    info!("Initializing Bluetooth...");

    let session = Session::new().await.context("Failed to create BlueZ session")?;
    info!("BlueZ session created");

    let adapter = match &config.adapter_name {
        Some(name) => session.adapter(name)?,
        None => session.default_adapter().await?,
    };
    info!("Using Bluetooth adapter: {}", adapter.name());

    let connector = BluezConnector {
        session: session.clone(),
        adapter: adapter.clone(),
        service_uuid: SPP_UUID,
        fallback_channel: config.fallback_channel,
    };

    Ok((Arc::new(BluezAdapter::new(adapter)), Arc::new(connector)))
}

/// BlueZ adapter.
pub struct BluezAdapter {
    adapter: Adapter,
    discovery_task: Mutex<Option<JoinHandle<()>>>,
}

impl BluezAdapter {
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            discovery_task: Mutex::new(None),
        }
    }

    async fn device_handle(adapter: &Adapter, addr: bluer::Address) -> DeviceHandle {
        let name = match adapter.device(addr) {
            Ok(device) => device.name().await.ok().flatten(),
            Err(_) => None,
        };
        DeviceHandle::new(addr, name)
    }
}

#[async_trait]
impl BluetoothAdapter for BluezAdapter {
    fn name(&self) -> String {
        self.adapter.name().to_string()
    }

    async fn is_enabled(&self) -> bool {
        match self.adapter.is_powered().await {
            Ok(powered) => powered,
            Err(e) => {
                warn!("Failed to read adapter power state: {}", e);
                false
            }
        }
    }

    async fn set_enabled(&self, enabled: bool) -> Result<()> {
        info!("Setting adapter power: {}", enabled);
        self.adapter.set_powered(enabled).await?;
        Ok(())
    }

    async fn has_discovery_permission(&self) -> bool {
        // BlueZ gates discovery through D-Bus policy; a session that reached
        // the adapter is allowed to scan.
        true
    }

    async fn is_discovering(&self) -> bool {
        if self.discovery_task.lock().is_some() {
            return true;
        }
        self.adapter.is_discovering().await.unwrap_or(false)
    }

    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveryEvent>> {
        self.cancel_discovery().await?;

        self.adapter
            .set_discovery_filter(DiscoveryFilter {
                transport: DiscoveryTransport::BrEdr,
                ..Default::default()
            })
            .await?;

        let events = self.adapter.discover_devices().await?;
        let (event_tx, event_rx) = mpsc::channel(32);
        let adapter = self.adapter.clone();
        info!("Discovery started on {}", adapter.name());

        // Discovery stays active for as long as the event stream is alive.
        let task = tokio::spawn(async move {
            pin_mut!(events);
            while let Some(event) = events.next().await {
                if let AdapterEvent::DeviceAdded(addr) = event {
                    let device = Self::device_handle(&adapter, addr).await;
                    debug!("Device found: {}", device);
                    if event_tx.send(DiscoveryEvent::DeviceFound(device)).await.is_err() {
                        return;
                    }
                }
            }
            let _ = event_tx.send(DiscoveryEvent::Finished).await;
        });

        *self.discovery_task.lock() = Some(task);
        Ok(event_rx)
    }

    async fn cancel_discovery(&self) -> Result<()> {
        if let Some(task) = self.discovery_task.lock().take() {
            task.abort();
            info!("Discovery cancelled");
        }
        Ok(())
    }

    async fn bonded_devices(&self) -> Result<Vec<DeviceHandle>> {
        let mut devices = Vec::new();

        for addr in self.adapter.device_addresses().await? {
            let device = match self.adapter.device(addr) {
                Ok(device) => device,
                Err(e) => {
                    warn!("Skipping device {}: {}", addr, e);
                    continue;
                }
            };
            if is_paired_or_skip(addr, device.is_paired().await) {
                let name = device.name().await.ok().flatten();
                devices.push(DeviceHandle::new(addr, name));
            }
        }

        Ok(devices)
    }
}

/// Whether a bonded-device lookup should keep `addr`. Lookup errors skip it.
fn is_paired_or_skip<E: std::fmt::Display>(addr: bluer::Address, paired: Result<bool, E>) -> bool {
    match paired {
        Ok(paired) => paired,
        Err(e) => {
            warn!("Skipping device {}: {}", addr, e);
            false
        }
    }
}

/// BlueZ RFCOMM connector.
pub struct BluezConnector {
    session: Session,
    adapter: Adapter,
    service_uuid: Uuid,
    fallback_channel: Option<u8>,
}

impl BluezConnector {
    async fn open_service_record(&self, device: &DeviceHandle, uuid: Uuid) -> Result<Stream> {
        let profile = Profile {
            uuid,
            name: Some("Arduino".to_string()),
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };
        let mut handle = self.session.register_profile(profile).await?;
        let remote = self.adapter.device(device.address)?;

        let connect = async {
            remote
                .connect_profile(&uuid)
                .await
                .context("Profile connect failed")
        };
        let accept = async {
            let request = handle
                .next()
                .await
                .ok_or_else(|| anyhow!("Profile handle closed before connect"))?;
            request.accept().context("Failed to accept RFCOMM connection")
        };

        let ((), stream) = tokio::try_join!(connect, accept)?;
        Ok(stream)
    }
}

#[async_trait]
impl RfcommConnector for BluezConnector {
    fn strategies(&self) -> Vec<ConnectStrategy> {
        let mut strategies = vec![ConnectStrategy::ServiceRecord(self.service_uuid)];
        if let Some(channel) = self.fallback_channel {
            strategies.push(ConnectStrategy::Channel(channel));
        }
        strategies
    }

    async fn open(&self, device: &DeviceHandle, strategy: ConnectStrategy) -> Result<BoxedStream> {
        debug!("Opening {} via {}", device, strategy);
        let stream = match strategy {
            ConnectStrategy::ServiceRecord(uuid) => self.open_service_record(device, uuid).await?,
            ConnectStrategy::Channel(channel) => {
                Stream::connect(SocketAddr::new(device.address, channel)).await?
            }
        };
        Ok(Box::new(stream))
    }
}
