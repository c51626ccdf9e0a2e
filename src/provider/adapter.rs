//! Injected provider adapter
//!
//! Only one provider account is active at a time. Pairing again after the
//! user switched accounts replaces the previous session.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{ProviderDetector, ProviderSession};
use crate::core::config::KeyringConfig;
use crate::core::errors::{KeyringError, Result};
use crate::keyring::{EventKind, EventPayload, Keyring, RoutingKey, SessionHandle};

pub struct InjectedProviderAdapter {
    keyring: Arc<Keyring>,
    detector: Arc<dyn ProviderDetector>,
    label: String,
    detect_timeout: Duration,
    /// Device id to evict when the active account changes
    current_device_id: Mutex<Option<String>>,
}

impl InjectedProviderAdapter {
    pub fn new(
        keyring: Arc<Keyring>,
        detector: Arc<dyn ProviderDetector>,
        label: impl Into<String>,
        detect_timeout: Duration,
    ) -> Self {
        Self {
            keyring,
            detector,
            label: label.into(),
            detect_timeout,
            current_device_id: Mutex::new(None),
        }
    }

    pub fn use_keyring(keyring: Arc<Keyring>, detector: Arc<dyn ProviderDetector>, config: &KeyringConfig) -> Self {
        Self::new(
            keyring,
            detector,
            config.provider.label.clone(),
            config.provider.detect_timeout(),
        )
    }

    /// Nothing to discover up front; reports the registered session count.
    pub async fn initialize(&self) -> usize {
        self.keyring.len()
    }

    pub fn current_device_id(&self) -> Option<String> {
        self.current_device_id.lock().clone()
    }

    /// Detect the provider, request account access and register a session
    /// for the active account.
    pub async fn pair_device(&self) -> Result<SessionHandle> {
        let provider = self
            .detector
            .detect(self.detect_timeout)
            .await?
            .ok_or_else(|| {
                KeyringError::ProviderNotFound(format!(
                    "{} did not respond within {}ms",
                    self.label,
                    self.detect_timeout.as_millis()
                ))
            })?;

        let accounts = provider.request_accounts().await.map_err(|e| {
            warn!(provider = %self.label, error = %e, "Could not get provider accounts");
            e
        })?;

        let session = ProviderSession::new(provider, self.label.clone(), accounts)?;
        let device_id = session.identifier();

        let previous = self.current_device_id.lock().take();
        if let Some(previous) = previous.filter(|id| id != &device_id) {
            self.keyring.remove(&previous).await;
        }

        let session: SessionHandle = Arc::new(session);
        self.keyring.add(session.clone(), device_id.clone());
        *self.current_device_id.lock() = Some(device_id.clone());

        info!(provider = %self.label, device_id = %device_id, "Provider paired");
        self.keyring.emit(
            RoutingKey::new(self.label.as_str(), device_id.as_str(), EventKind::Connect),
            EventPayload::Device(device_id),
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::RoutingPattern;
    use crate::provider::InjectedProvider;
    use async_trait::async_trait;

    struct FakeProvider {
        accounts: Mutex<Result<Vec<String>>>,
    }

    impl FakeProvider {
        fn with(accounts: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                accounts: Mutex::new(Ok(accounts.iter().map(|a| a.to_string()).collect())),
            })
        }

        fn set(&self, accounts: Result<Vec<String>>) {
            *self.accounts.lock() = accounts;
        }
    }

    #[async_trait]
    impl InjectedProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn request_accounts(&self) -> Result<Vec<String>> {
            match &*self.accounts.lock() {
                Ok(accounts) => Ok(accounts.clone()),
                Err(e) => Err(KeyringError::Provider(e.to_string())),
            }
        }
    }

    struct FakeDetector(Option<Arc<FakeProvider>>);

    #[async_trait]
    impl ProviderDetector for FakeDetector {
        async fn detect(&self, _timeout: Duration) -> Result<Option<Arc<dyn InjectedProvider>>> {
            Ok(self.0.clone().map(|p| p as Arc<dyn InjectedProvider>))
        }
    }

    fn adapter(provider: Option<Arc<FakeProvider>>) -> (Arc<Keyring>, InjectedProviderAdapter) {
        let keyring = Arc::new(Keyring::new());
        let adapter = InjectedProviderAdapter::use_keyring(
            keyring.clone(),
            Arc::new(FakeDetector(provider)),
            &KeyringConfig::default(),
        );
        (keyring, adapter)
    }

    #[tokio::test]
    async fn test_pair_registers_and_emits() {
        let (keyring, adapter) = adapter(Some(FakeProvider::with(&["0xAA"])));
        let mut rx = keyring.subscribe_channel(RoutingPattern::all());

        let session = adapter.pair_device().await.unwrap();

        assert!(Arc::ptr_eq(&keyring.get("tally:0xaa").unwrap(), &session));
        assert_eq!(adapter.current_device_id().as_deref(), Some("tally:0xaa"));
        assert_eq!(adapter.initialize().await, 1);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.key.to_string(), "Tally.tally:0xaa.CONNECT");
        assert_eq!(event.payload.device_id(), Some("tally:0xaa"));
    }

    #[tokio::test]
    async fn test_account_switch_replaces_session() {
        let provider = FakeProvider::with(&["0xAA"]);
        let (keyring, adapter) = adapter(Some(provider.clone()));

        adapter.pair_device().await.unwrap();
        provider.set(Ok(vec!["0xBB".into()]));
        adapter.pair_device().await.unwrap();

        assert_eq!(keyring.wallets(), vec!["tally:0xbb".to_string()]);
    }

    #[tokio::test]
    async fn test_repairing_same_account_keeps_one_session() {
        let (keyring, adapter) = adapter(Some(FakeProvider::with(&["0xAA"])));
        adapter.pair_device().await.unwrap();
        adapter.pair_device().await.unwrap();
        assert_eq!(keyring.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_provider() {
        let (keyring, adapter) = adapter(None);
        let err = adapter.pair_device().await.err().unwrap();
        assert!(matches!(err, KeyringError::ProviderNotFound(_)));
        assert!(keyring.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_request_propagates() {
        let provider = FakeProvider::with(&[]);
        provider.set(Err(KeyringError::Provider("User rejected the request".into())));
        let (keyring, adapter) = adapter(Some(provider));
        let mut rx = keyring.subscribe_channel(RoutingPattern::all());

        let err = adapter.pair_device().await.err().unwrap();
        assert!(err.to_string().contains("User rejected"));
        assert!(keyring.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
