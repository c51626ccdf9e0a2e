//! Session over an injected provider

use async_trait::async_trait;
use std::sync::Arc;

use super::InjectedProvider;
use crate::core::errors::{KeyringError, Result};
use crate::keyring::{Capability, TransportKind, WalletSession};

const CAPABILITIES: &[Capability] = &[Capability::Ethereum];

/// Wallet session bound to the provider's active account
pub struct ProviderSession {
    provider: Arc<dyn InjectedProvider>,
    label: String,
    accounts: Vec<String>,
}

impl ProviderSession {
    /// Fails when the provider granted no accounts.
    pub fn new(provider: Arc<dyn InjectedProvider>, label: impl Into<String>, accounts: Vec<String>) -> Result<Self> {
        let label = label.into();
        if accounts.is_empty() {
            return Err(KeyringError::Provider(format!("{} granted no accounts", label)));
        }
        Ok(Self {
            provider,
            label,
            accounts,
        })
    }

    /// Active account, the first one granted
    pub fn account(&self) -> &str {
        &self.accounts[0]
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// `"<label>:<account>"`, lowercased
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.label, self.account()).to_lowercase()
    }
}

#[async_trait]
impl WalletSession for ProviderSession {
    fn vendor(&self) -> &str {
        &self.label
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::InjectedProvider
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    async fn device_id(&self) -> Result<String> {
        Ok(self.identifier())
    }

    async fn disconnect(&self) -> Result<()> {
        self.provider.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Chain;

    struct Named;

    #[async_trait]
    impl InjectedProvider for Named {
        fn name(&self) -> &str {
            "tally"
        }

        async fn request_accounts(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_device_id_is_label_and_account() {
        let session = ProviderSession::new(
            Arc::new(Named),
            "Tally",
            vec!["0xAbC0000000000000000000000000000000000001".into(), "0x02".into()],
        )
        .unwrap();

        assert_eq!(
            session.device_id().await.unwrap(),
            "tally:0xabc0000000000000000000000000000000000001"
        );
        assert_eq!(session.vendor(), "Tally");
        assert_eq!(session.transport_kind(), TransportKind::InjectedProvider);
    }

    #[test]
    fn test_no_accounts_is_error() {
        let err = ProviderSession::new(Arc::new(Named), "Tally", vec![]).err().unwrap();
        assert!(matches!(err, KeyringError::Provider(_)));
    }

    #[test]
    fn test_ethereum_only() {
        let session = ProviderSession::new(Arc::new(Named), "Tally", vec!["0x01".into()]).unwrap();
        assert!(session.supports(Capability::Ethereum));
        assert!(!session.supports(Capability::Bitcoin));
        assert!(session.describe_path(Chain::Cosmos, &[]).is_none());
    }
}
