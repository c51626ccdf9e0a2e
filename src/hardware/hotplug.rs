//! Hot-plug event sources
//!
//! Native HID stacks expose no attach/detach callbacks, so devices are
//! polled and consecutive snapshots diffed into [`HotplugEvent`]s.

use super::{HotplugEvent, UsbDeviceInfo};

/// Events turning `previous` into `current`: vanished devices first, then
/// appeared ones, each in snapshot order.
///
/// A device that re-enumerates with a new product id between two polls
/// (on-device app switch) shows up as a vanish followed by an appear.
pub fn diff_devices(previous: &[UsbDeviceInfo], current: &[UsbDeviceInfo]) -> Vec<HotplugEvent> {
    let vanished = previous
        .iter()
        .filter(|old| !current.iter().any(|new| new.same_device(old)))
        .cloned()
        .map(HotplugEvent::Vanished);

    let appeared = current
        .iter()
        .filter(|new| !previous.iter().any(|old| old.same_device(new)))
        .cloned()
        .map(HotplugEvent::Appeared);

    vanished.chain(appeared).collect()
}

#[cfg(feature = "hid")]
pub use monitor::spawn_hid_monitor;

#[cfg(feature = "hid")]
mod monitor {
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tracing::{debug, warn};

    use super::diff_devices;
    use crate::hardware::hid::list_devices;
    use crate::hardware::HotplugEvent;

    /// Poll the HID device list every `interval` and forward changes for
    /// `vendor_id`. Devices attached before the first poll produce no event.
    /// Stops when the receiver is dropped.
    pub fn spawn_hid_monitor(
        vendor_id: u16,
        interval: Duration,
        events: mpsc::Sender<HotplugEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut previous = poll(vendor_id).await.unwrap_or_default();
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if events.is_closed() {
                    debug!("Hot-plug receiver dropped, stopping HID monitor");
                    return;
                }

                let Some(current) = poll(vendor_id).await else {
                    continue;
                };
                for event in diff_devices(&previous, &current) {
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
                previous = current;
            }
        })
    }

    async fn poll(vendor_id: u16) -> Option<Vec<crate::hardware::UsbDeviceInfo>> {
        match tokio::task::spawn_blocking(move || list_devices(vendor_id)).await {
            Ok(Ok(devices)) => Some(devices),
            Ok(Err(e)) => {
                warn!(error = %e, "HID enumeration failed");
                None
            }
            Err(e) => {
                warn!(error = %e, "HID enumeration task failed");
                None
            }
        }
    }
}
