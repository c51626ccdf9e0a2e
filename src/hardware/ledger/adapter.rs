//! USB hot-plug adapter for Ledger devices
//!
//! Switching apps on a Ledger detaches and re-attaches it on the bus. A
//! vanished device is therefore only evicted after a grace window, and only
//! if no newer event for the same device arrived in the meantime.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session::LedgerSession;
use crate::core::config::KeyringConfig;
use crate::core::errors::{KeyringError, Result};
use crate::hardware::{HotplugEvent, TransportChannel, UsbDeviceInfo, UsbDiscovery};
use crate::keyring::{ErrorPayload, EventKind, EventPayload, Keyring, RoutingKey, SessionHandle};

/// Per-device record of the most recent event.
///
/// Stamps come from a counter rather than a clock so two events in the same
/// tick remain ordered.
#[derive(Default)]
struct EventStamps {
    counter: AtomicU64,
    last: Mutex<HashMap<String, u64>>,
}

impl EventStamps {
    fn touch(&self, device_id: &str) -> u64 {
        let stamp = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.last.lock().insert(device_id.to_string(), stamp);
        stamp
    }

    /// Clears the record when `stamp` is still the latest for `device_id`.
    fn take_if_current(&self, device_id: &str, stamp: u64) -> bool {
        let mut last = self.last.lock();
        if last.get(device_id) == Some(&stamp) {
            last.remove(device_id);
            true
        } else {
            false
        }
    }
}

/// Ledger adapter
///
/// One per process, bound to the shared keyring.
pub struct LedgerUsbAdapter {
    keyring: Arc<Keyring>,
    discovery: Arc<dyn UsbDiscovery>,
    vendor_id: u16,
    grace_window: Duration,
    stamps: Arc<EventStamps>,
}

impl LedgerUsbAdapter {
    pub fn new(
        keyring: Arc<Keyring>,
        discovery: Arc<dyn UsbDiscovery>,
        vendor_id: u16,
        grace_window: Duration,
    ) -> Self {
        Self {
            keyring,
            discovery,
            vendor_id,
            grace_window,
            stamps: Arc::new(EventStamps::default()),
        }
    }

    /// Build an adapter from configuration.
    pub fn use_keyring(keyring: Arc<Keyring>, discovery: Arc<dyn UsbDiscovery>, config: &KeyringConfig) -> Self {
        Self::new(keyring, discovery, config.ledger.vendor_id, config.hotplug.grace_window())
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn keyring(&self) -> &Arc<Keyring> {
        &self.keyring
    }

    /// Register a session for `transport`, or for the first discovered
    /// device when `None`. Returns the number of registered sessions.
    ///
    /// Ledger serial numbers are not unique across all models, so at most one
    /// Ledger is expected on the keyring at a time.
    pub async fn initialize(&self, transport: Option<Box<dyn TransportChannel>>) -> Result<usize> {
        let channel = match transport {
            Some(channel) => channel,
            None => {
                let device = self
                    .discovery
                    .enumerate(self.vendor_id)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or(KeyringError::DeviceNotFound { vendor_id: self.vendor_id })?;
                self.keyring.remove(device.device_id()?).await;
                self.discovery.open(&device).await?
            }
        };

        let device_id = channel.device().device_id()?.to_string();
        self.keyring.add(Arc::new(LedgerSession::new(channel)), device_id.clone());
        // A fresh registration supersedes any pending eviction.
        self.stamps.touch(&device_id);

        let count = self.keyring.len();
        info!(device_id = %device_id, sessions = count, "Ledger session initialized");
        Ok(count)
    }

    /// Let the user pick a device, register it and return its session.
    pub async fn pair_device(&self) -> Result<SessionHandle> {
        let channel = self.discovery.request(self.vendor_id).await?;
        let device = channel.device().clone();
        self.initialize(Some(channel)).await?;
        self.get(&device)
    }

    /// Registered session for `device`.
    pub fn get(&self, device: &UsbDeviceInfo) -> Result<SessionHandle> {
        let device_id = device.device_id()?;
        self.keyring
            .get(device_id)
            .ok_or_else(|| KeyringError::SessionNotFound(device_id.to_string()))
    }

    /// Consume hot-plug events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::Receiver<HotplugEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        debug!("Hot-plug event stream closed");
    }

    /// React to one hot-plug event. Never fails; problems are published as
    /// FAILURE events. For a handled disconnect, returns the deferred
    /// eviction task, which resolves to whether the device was evicted.
    pub fn handle_event(&self, event: HotplugEvent) -> Option<JoinHandle<bool>> {
        match event {
            HotplugEvent::Appeared(device) => {
                self.handle_connect(&device);
                None
            }
            HotplugEvent::Vanished(device) => self.handle_disconnect(&device),
        }
    }

    fn handle_connect(&self, device: &UsbDeviceInfo) {
        if device.vendor_id != self.vendor_id {
            return;
        }

        match device.device_id() {
            Ok(device_id) => {
                self.stamps.touch(device_id);
                debug!(device_id = %device_id, "Ledger attached");
                self.keyring.emit(
                    RoutingKey::new(device.label(), device_id, EventKind::Connect),
                    EventPayload::Device(device_id.to_string()),
                );
            }
            Err(e) => self.emit_failure(device, &e),
        }
    }

    fn handle_disconnect(&self, device: &UsbDeviceInfo) -> Option<JoinHandle<bool>> {
        if device.vendor_id != self.vendor_id {
            return None;
        }

        let device_id = match device.device_id() {
            Ok(id) => id.to_string(),
            Err(e) => {
                self.emit_failure(device, &e);
                return None;
            }
        };

        self.keyring.emit(
            RoutingKey::new(device.label(), device_id.as_str(), EventKind::Disconnect),
            EventPayload::Device(device_id.clone()),
        );

        let stamp = self.stamps.touch(&device_id);
        let keyring = self.keyring.clone();
        let stamps = self.stamps.clone();
        let grace_window = self.grace_window;

        Some(tokio::spawn(async move {
            tokio::time::sleep(grace_window).await;

            if !stamps.take_if_current(&device_id, stamp) {
                debug!(device_id = %device_id, "Disconnect superseded by a newer event");
                return false;
            }
            keyring.remove(&device_id).await
        }))
    }

    fn emit_failure(&self, device: &UsbDeviceInfo, error: &KeyringError) {
        warn!(error = %error, "Hot-plug event could not be handled");
        let device_id = device.serial_number.clone();
        self.keyring.emit(
            RoutingKey::new(device.label(), device_id.clone().unwrap_or_default(), EventKind::Failure),
            EventPayload::Failure {
                device_id,
                error: ErrorPayload::from(error),
            },
        );
    }
}
