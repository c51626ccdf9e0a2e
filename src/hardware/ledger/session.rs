//! Ledger wallet session over a USB transport channel

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::errors::{KeyringError, Result};
use crate::hardware::{TransportChannel, UsbDeviceInfo};
use crate::keyring::{Capability, TransportKind, WalletSession};
use crate::path::Chain;

/// Dashboard-level "get app and version" command (works in every app).
const GET_APP_AND_VERSION: [u8; 5] = [0xB0, 0x01, 0x00, 0x00, 0x00];

const SW_OK: u16 = 0x9000;

/// Application currently open on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAppInfo {
    pub name: String,
    pub version: String,
    pub flags: Vec<u8>,
}

/// Session bound to one Ledger channel
pub struct LedgerSession {
    channel: Box<dyn TransportChannel>,
    capabilities: Vec<Capability>,
}

impl LedgerSession {
    pub fn new(channel: Box<dyn TransportChannel>) -> Self {
        let mut capabilities = vec![Capability::Bitcoin, Capability::Ethereum];
        capabilities.extend(Chain::ALL.into_iter().map(Capability::Chain));
        Self { channel, capabilities }
    }

    pub fn device(&self) -> &UsbDeviceInfo {
        self.channel.device()
    }

    /// Query the name and version of the open application.
    pub async fn get_app_configuration(&self) -> Result<LedgerAppInfo> {
        let response = self.channel.exchange(&GET_APP_AND_VERSION).await?;
        let info = parse_app_and_version(&response)?;
        info!(app = %info.name, version = %info.version, "Ledger application");
        Ok(info)
    }
}

/// Response layout:
/// `format(1)=1 | name_len | name | version_len | version | flags_len | flags | sw(2)`
fn parse_app_and_version(response: &[u8]) -> Result<LedgerAppInfo> {
    let malformed = |what: &str| KeyringError::Transport(format!("malformed app info: {}", what));

    if response.len() < 2 {
        return Err(malformed("response too short"));
    }
    let (body, sw) = response.split_at(response.len() - 2);
    let status = u16::from_be_bytes([sw[0], sw[1]]);
    if status != SW_OK {
        return Err(KeyringError::Transport(format!("device returned status {:04X}", status)));
    }
    debug!(body = %hex::encode(body), "GET_APP_AND_VERSION response");

    let (&format, rest) = body.split_first().ok_or_else(|| malformed("empty body"))?;
    if format != 0x01 {
        return Err(malformed("unknown format"));
    }

    let (name, rest) = take_lv(rest).ok_or_else(|| malformed("name"))?;
    let (version, rest) = take_lv(rest).ok_or_else(|| malformed("version"))?;
    let flags = take_lv(rest).map(|(flags, _)| flags.to_vec()).unwrap_or_default();

    Ok(LedgerAppInfo {
        name: String::from_utf8_lossy(name).into_owned(),
        version: String::from_utf8_lossy(version).into_owned(),
        flags,
    })
}

/// Split a length-prefixed field off the front of `bytes`.
fn take_lv(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&len, rest) = bytes.split_first()?;
    let len = len as usize;
    (rest.len() >= len).then(|| rest.split_at(len))
}

#[async_trait]
impl WalletSession for LedgerSession {
    fn vendor(&self) -> &str {
        match self.device().label() {
            "" => "Ledger",
            label => label,
        }
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::Usb
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn device_id(&self) -> Result<String> {
        self.device().device_id().map(str::to_string)
    }

    async fn disconnect(&self) -> Result<()> {
        self.channel.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_app_and_version() {
        let mut response = vec![0x01, 0x06];
        response.extend_from_slice(b"Kujira");
        response.push(0x05);
        response.extend_from_slice(b"2.1.0");
        response.extend_from_slice(&[0x01, 0x02, 0x90, 0x00]);

        let info = parse_app_and_version(&response).unwrap();
        assert_eq!(info.name, "Kujira");
        assert_eq!(info.version, "2.1.0");
        assert_eq!(info.flags, vec![0x02]);
    }

    #[test]
    fn test_parse_rejects_error_status() {
        let err = parse_app_and_version(&[0x6E, 0x01]).unwrap_err();
        assert!(err.to_string().contains("6E01"));
    }

    #[test]
    fn test_parse_rejects_truncated_name() {
        let err = parse_app_and_version(&[0x01, 0x09, b'B', 0x90, 0x00]).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_parse_without_flags() {
        let info = parse_app_and_version(&[0x01, 0x01, b'X', 0x01, b'1', 0x90, 0x00]).unwrap();
        assert_eq!(info.name, "X");
        assert!(info.flags.is_empty());
    }
}
