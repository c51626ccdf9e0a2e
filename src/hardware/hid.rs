//! Native USB HID backend (hidapi)
//!
//! Blocking hidapi calls run on tokio's blocking pool.

use async_trait::async_trait;
use hidapi::{DeviceInfo, HidApi, HidDevice};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::ledger::framing::{frame_apdu, Reassembler, HID_PACKET_SIZE};
use super::ledger::LEDGER_USAGE_PAGE;
use super::{TransportChannel, UsbDeviceInfo, UsbDiscovery};
use crate::core::errors::{KeyringError, Result};

/// Default read timeout; on-device confirmation can take a while.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

fn hid_api() -> Result<HidApi> {
    HidApi::new().map_err(|e| KeyringError::TransportOpen(format!("HID API init failed: {}", e)))
}

fn to_device_info(info: &DeviceInfo) -> UsbDeviceInfo {
    UsbDeviceInfo {
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        serial_number: info.serial_number().map(str::to_string),
        manufacturer_name: info.manufacturer_string().map(str::to_string),
        product_name: info.product_string().map(str::to_string),
    }
}

/// Ledger devices expose several HID interfaces; only the APDU one counts.
fn is_apdu_interface(info: &DeviceInfo) -> bool {
    info.usage_page() == LEDGER_USAGE_PAGE || info.interface_number() == 0
}

/// Attached devices of `vendor_id`, one entry per physical device. Blocking.
pub fn list_devices(vendor_id: u16) -> Result<Vec<UsbDeviceInfo>> {
    let api = hid_api()?;
    let mut devices: Vec<UsbDeviceInfo> = Vec::new();
    for info in api.device_list().filter(|d| d.vendor_id() == vendor_id && is_apdu_interface(d)) {
        let device = to_device_info(info);
        if !devices.iter().any(|known| known.same_device(&device)) {
            devices.push(device);
        }
    }
    Ok(devices)
}

fn open_blocking(target: &UsbDeviceInfo) -> Result<HidDevice> {
    let api = hid_api()?;
    let info = api
        .device_list()
        .filter(|d| is_apdu_interface(d))
        .find(|d| to_device_info(d).same_device(target))
        .ok_or(KeyringError::DeviceNotFound { vendor_id: target.vendor_id })?;
    info.open_device(&api)
        .map_err(|e| KeyringError::TransportOpen(format!("open failed: {}", e)))
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KeyringError::Transport(format!("blocking task failed: {}", e)))?
}

/// hidapi-backed discovery
#[derive(Debug, Default, Clone)]
pub struct HidDiscovery;

impl HidDiscovery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UsbDiscovery for HidDiscovery {
    async fn enumerate(&self, vendor_id: u16) -> Result<Vec<UsbDeviceInfo>> {
        blocking(move || list_devices(vendor_id)).await
    }

    async fn open(&self, device: &UsbDeviceInfo) -> Result<Box<dyn TransportChannel>> {
        let target = device.clone();
        let info = device.clone();
        let handle = blocking(move || open_blocking(&target)).await?;
        info!(
            product = info.product_name.as_deref().unwrap_or("unknown"),
            serial = info.serial_number.as_deref().unwrap_or("unknown"),
            "Opened HID device"
        );
        Ok(Box::new(HidChannel::new(info, handle)))
    }

    /// Native HID has no chooser: the first attached device is used.
    async fn request(&self, vendor_id: u16) -> Result<Box<dyn TransportChannel>> {
        let device = self
            .enumerate(vendor_id)
            .await?
            .into_iter()
            .next()
            .ok_or(KeyringError::DeviceNotFound { vendor_id })?;
        self.open(&device).await
    }
}

/// Open HID channel speaking framed APDUs
pub struct HidChannel {
    info: UsbDeviceInfo,
    device: Arc<Mutex<Option<HidDevice>>>,
    timeout: Duration,
}

impl HidChannel {
    fn new(info: UsbDeviceInfo, device: HidDevice) -> Self {
        Self {
            info,
            device: Arc::new(Mutex::new(Some(device))),
            timeout: READ_TIMEOUT,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

#[async_trait]
impl TransportChannel for HidChannel {
    fn device(&self) -> &UsbDeviceInfo {
        &self.info
    }

    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>> {
        let packets = frame_apdu(command);
        let device = self.device.clone();
        let timeout_ms = self.timeout.as_millis().min(i32::MAX as u128) as i32;

        blocking(move || {
            let guard = device.lock();
            let hid = guard
                .as_ref()
                .ok_or_else(|| KeyringError::Transport("channel closed".into()))?;

            for packet in &packets {
                hid.write(packet)
                    .map_err(|e| KeyringError::Transport(format!("write failed: {}", e)))?;
            }

            let mut reassembler = Reassembler::new();
            loop {
                let mut report = [0u8; HID_PACKET_SIZE];
                let read = hid
                    .read_timeout(&mut report, timeout_ms)
                    .map_err(|e| KeyringError::Transport(format!("read failed: {}", e)))?;
                if read == 0 {
                    return Err(KeyringError::Transport("read timed out".into()));
                }
                if let Some(response) = reassembler.push(&report[..read])? {
                    return Ok(response);
                }
            }
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        if self.device.lock().take().is_some() {
            debug!(serial = self.info.serial_number.as_deref().unwrap_or("unknown"), "Closed HID device");
        }
        Ok(())
    }
}
