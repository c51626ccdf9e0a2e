//! Injected wallet providers
//!
//! Browser-extension style wallets expose an EIP-1193 provider rather than a
//! USB device. Detection and the JSON-RPC surface are collaborators; this
//! module owns the keyring bookkeeping around them.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::core::errors::Result;

pub mod adapter;
pub mod session;

pub use adapter::InjectedProviderAdapter;
pub use session::ProviderSession;

/// An injected provider instance
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    /// Provider name as announced by the extension
    fn name(&self) -> &str;

    /// `eth_requestAccounts`; may prompt the user.
    async fn request_accounts(&self) -> Result<Vec<String>>;

    /// Drop any provider-side connection state.
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

/// Locates an injected provider
#[async_trait]
pub trait ProviderDetector: Send + Sync {
    /// Wait up to `timeout` for a provider to appear. `Ok(None)` when
    /// nothing was injected in time.
    async fn detect(&self, timeout: Duration) -> Result<Option<Arc<dyn InjectedProvider>>>;
}
