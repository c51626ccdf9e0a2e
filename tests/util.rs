// tests/util.rs
// Shared test doubles: in-memory USB discovery and transport channels.
#![allow(dead_code)]

use async_trait::async_trait;
use hdwallet_keyring::core::errors::{KeyringError, Result};
use hdwallet_keyring::hardware::{TransportChannel, UsbDeviceInfo, UsbDiscovery};
use hdwallet_keyring::hardware::ledger::LEDGER_VENDOR_ID;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn ledger(serial: &str) -> UsbDeviceInfo {
    UsbDeviceInfo {
        vendor_id: LEDGER_VENDOR_ID,
        product_id: 0x4011,
        serial_number: Some(serial.to_string()),
        manufacturer_name: Some("Ledger".to_string()),
        product_name: Some("Nano X".to_string()),
    }
}

pub fn foreign(serial: &str) -> UsbDeviceInfo {
    UsbDeviceInfo {
        vendor_id: 0x534C,
        product_id: 0x0001,
        serial_number: Some(serial.to_string()),
        manufacturer_name: Some("SatoshiLabs".to_string()),
        product_name: Some("TREZOR".to_string()),
    }
}

/// Channel that answers every command with a fixed response and counts closes.
pub struct MockChannel {
    device: UsbDeviceInfo,
    response: Vec<u8>,
    pub closes: Arc<AtomicUsize>,
}

impl MockChannel {
    pub fn new(device: UsbDeviceInfo) -> Self {
        Self {
            device,
            response: vec![0x90, 0x00],
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_response(mut self, response: Vec<u8>) -> Self {
        self.response = response;
        self
    }
}

#[async_trait]
impl TransportChannel for MockChannel {
    fn device(&self) -> &UsbDeviceInfo {
        &self.device
    }

    async fn exchange(&self, _command: &[u8]) -> Result<Vec<u8>> {
        Ok(self.response.clone())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Discovery over a mutable list of attached devices.
#[derive(Default)]
pub struct MockDiscovery {
    attached: Mutex<Vec<UsbDeviceInfo>>,
    /// Device returned by the chooser; `None` means the user cancelled.
    chosen: Mutex<Option<UsbDeviceInfo>>,
    pub opened: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
}

impl MockDiscovery {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach(&self, device: UsbDeviceInfo) {
        self.attached.lock().unwrap().push(device);
    }

    pub fn detach_all(&self) {
        self.attached.lock().unwrap().clear();
    }

    pub fn choose(&self, device: UsbDeviceInfo) {
        *self.chosen.lock().unwrap() = Some(device);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsbDiscovery for MockDiscovery {
    async fn enumerate(&self, vendor_id: u16) -> Result<Vec<UsbDeviceInfo>> {
        Ok(self
            .attached
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.vendor_id == vendor_id)
            .cloned()
            .collect())
    }

    async fn open(&self, device: &UsbDeviceInfo) -> Result<Box<dyn TransportChannel>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let mut channel = MockChannel::new(device.clone());
        channel.closes = self.closes.clone();
        Ok(Box::new(channel))
    }

    async fn request(&self, vendor_id: u16) -> Result<Box<dyn TransportChannel>> {
        let chosen = self.chosen.lock().unwrap().clone();
        match chosen {
            Some(device) if device.vendor_id == vendor_id => self.open(&device).await,
            _ => Err(KeyringError::PairingCancelled("no device selected".into())),
        }
    }
}
