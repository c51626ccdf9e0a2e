//! Hardware wallet transports and the USB hot-plug adapter
//!
//! The USB stack is reached through two collaborator traits:
//! [`UsbDiscovery`] finds and opens devices, [`TransportChannel`] is one
//! open channel. Hot-plug notifications arrive as [`HotplugEvent`]s on a
//! channel, from [`hotplug`] polling or any other event source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::{KeyringError, Result};

pub mod hotplug;
pub mod ledger;

#[cfg(feature = "hid")]
pub mod hid;

pub use hotplug::diff_devices;
pub use ledger::{LedgerSession, LedgerUsbAdapter};

/// Identity of one attached USB device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub manufacturer_name: Option<String>,
    pub product_name: Option<String>,
}

impl UsbDeviceInfo {
    /// Routing label for lifecycle events (manufacturer, or empty)
    pub fn label(&self) -> &str {
        self.manufacturer_name.as_deref().unwrap_or_default()
    }

    /// Stable identifier: the serial number.
    pub fn device_id(&self) -> Result<&str> {
        self.serial_number.as_deref().ok_or_else(|| {
            KeyringError::MissingDeviceId(format!(
                "{} {:04x}:{:04x} reports no serial number",
                self.product_name.as_deref().unwrap_or("device"),
                self.vendor_id,
                self.product_id
            ))
        })
    }

    /// Same physical device, as far as enumeration can tell
    pub fn same_device(&self, other: &UsbDeviceInfo) -> bool {
        self.vendor_id == other.vendor_id
            && self.product_id == other.product_id
            && self.serial_number == other.serial_number
    }
}

/// Device attach/detach notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    Appeared(UsbDeviceInfo),
    Vanished(UsbDeviceInfo),
}

impl HotplugEvent {
    pub fn device(&self) -> &UsbDeviceInfo {
        match self {
            HotplugEvent::Appeared(device) | HotplugEvent::Vanished(device) => device,
        }
    }
}

/// One open channel to a device
#[async_trait]
pub trait TransportChannel: Send + Sync {
    fn device(&self) -> &UsbDeviceInfo;

    /// Send one command and wait for its response.
    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>>;

    /// Release the channel. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;
}

/// USB device discovery
#[async_trait]
pub trait UsbDiscovery: Send + Sync {
    /// Currently attached devices of `vendor_id`.
    async fn enumerate(&self, vendor_id: u16) -> Result<Vec<UsbDeviceInfo>>;

    async fn open(&self, device: &UsbDeviceInfo) -> Result<Box<dyn TransportChannel>>;

    /// Let the user choose a device of `vendor_id` and open it.
    async fn request(&self, vendor_id: u16) -> Result<Box<dyn TransportChannel>>;
}
