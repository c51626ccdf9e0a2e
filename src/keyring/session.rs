//! Wallet session capability interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::errors::Result;
use crate::path::{Chain, PathDescription};

/// Shared handle to a registered session
pub type SessionHandle = Arc<dyn WalletSession>;

/// Transport family a session was created over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Usb,
    InjectedProvider,
}

/// Signing operation families a session supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Bitcoin,
    Ethereum,
    /// Account-template chain, scoped by the path descriptor
    Chain(Chain),
}

/// One authenticated, attachable signing endpoint
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Manufacturer or provider label
    fn vendor(&self) -> &str;

    fn transport_kind(&self) -> TransportKind;

    fn capabilities(&self) -> &[Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Describe `path` for `chain`, or `None` when the session cannot sign
    /// for that chain at all.
    fn describe_path(&self, chain: Chain, path: &[u32]) -> Option<PathDescription> {
        self.supports(Capability::Chain(chain)).then(|| chain.describe(path))
    }

    /// Stable identifier the session registers under
    async fn device_id(&self) -> Result<String>;

    /// Release the underlying transport channel.
    async fn disconnect(&self) -> Result<()>;
}
