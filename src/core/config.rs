use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::errors::{KeyringError, Result};
use crate::hardware::ledger::LEDGER_VENDOR_ID;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "KEYRING_CONFIG";

/// Hot-plug correlation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotplugConfig {
    /// Delay before a vanished device is evicted (milliseconds).
    ///
    /// Devices that re-enumerate slower than this when switching on-device
    /// apps will still be evicted spuriously.
    #[serde(default = "HotplugConfig::default_grace_window_ms")]
    pub grace_window_ms: u64,

    /// Device list polling interval for the HID monitor (milliseconds)
    #[serde(default = "HotplugConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl HotplugConfig {
    fn default_grace_window_ms() -> u64 { 3_000 }
    fn default_poll_interval_ms() -> u64 { 2_000 }

    pub fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for HotplugConfig {
    fn default() -> Self {
        Self {
            grace_window_ms: Self::default_grace_window_ms(),
            poll_interval_ms: Self::default_poll_interval_ms(),
        }
    }
}

/// USB Ledger adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "LedgerConfig::default_vendor_id")]
    pub vendor_id: u16,
}

impl LedgerConfig {
    fn default_vendor_id() -> u16 { LEDGER_VENDOR_ID }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { vendor_id: Self::default_vendor_id() }
    }
}

/// Injected provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Routing label used for provider lifecycle events
    #[serde(default = "ProviderConfig::default_label")]
    pub label: String,

    /// How long to wait for the provider to be injected (milliseconds)
    #[serde(default = "ProviderConfig::default_detect_timeout_ms")]
    pub detect_timeout_ms: u64,
}

impl ProviderConfig {
    fn default_label() -> String { "Tally".to_string() }
    fn default_detect_timeout_ms() -> u64 { 3_000 }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            label: Self::default_label(),
            detect_timeout_ms: Self::default_detect_timeout_ms(),
        }
    }
}

/// Keyring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyringConfig {
    #[serde(default)]
    pub hotplug: HotplugConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl KeyringConfig {
    /// Parse a TOML document. Missing sections and fields take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: KeyringConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded keyring configuration");
        Ok(config)
    }

    /// Load from `$KEYRING_CONFIG`, falling back to defaults when the
    /// variable is unset or the file cannot be read.
    pub fn from_env() -> Self {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(&path).unwrap_or_else(|e| {
                warn!(path = %path, error = %e, "Failed to load keyring config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.hotplug.poll_interval_ms == 0 {
            return Err(KeyringError::Config("hotplug.poll_interval_ms must be non-zero".into()));
        }
        if self.provider.label.is_empty() {
            return Err(KeyringError::Config("provider.label must not be empty".into()));
        }
        Ok(())
    }
}
