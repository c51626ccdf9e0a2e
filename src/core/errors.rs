//! Keyring error types
//!
//! Registry operations never fail; only adapter orchestration
//! (`initialize`, `pair_device`) and input parsing surface these.

use thiserror::Error;

/// Errors returned by adapters, transports and parsers.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// No matching device was discovered.
    #[error("No device found for vendor {vendor_id:#06x}")]
    DeviceNotFound { vendor_id: u16 },

    /// A channel to the device could not be established.
    #[error("Failed to open transport: {0}")]
    TransportOpen(String),

    /// An established channel failed while exchanging data.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The user dismissed the device chooser.
    #[error("Pairing cancelled: {0}")]
    PairingCancelled(String),

    /// No injected provider answered within the detection timeout.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// The injected provider rejected a request.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The device does not expose a stable identifier (e.g. serial number).
    #[error("Device has no identifier: {0}")]
    MissingDeviceId(String),

    /// No session is registered under the identifier.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A textual derivation path could not be parsed.
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Keyring result type
pub type Result<T> = std::result::Result<T, KeyringError>;

impl KeyringError {
    /// Stable machine-readable code, used in FAILURE event payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeviceNotFound { .. } => "device_not_found",
            Self::TransportOpen(_) => "transport_open",
            Self::Transport(_) => "transport",
            Self::PairingCancelled(_) => "pairing_cancelled",
            Self::ProviderNotFound(_) => "provider_not_found",
            Self::Provider(_) => "provider",
            Self::MissingDeviceId(_) => "missing_device_id",
            Self::SessionNotFound(_) => "session_not_found",
            Self::InvalidPath(_) => "invalid_path",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Whether retrying the same call can reasonably succeed
    /// (device not plugged in yet, device busy, user cancelled).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. }
                | Self::TransportOpen(_)
                | Self::Transport(_)
                | Self::PairingCancelled(_)
                | Self::ProviderNotFound(_)
        )
    }
}

impl From<toml::de::Error> for KeyringError {
    fn from(err: toml::de::Error) -> Self {
        KeyringError::Config(err.to_string())
    }
}
