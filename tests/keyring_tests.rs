//! Keyring shared by several adapters

mod util;

use async_trait::async_trait;
use hdwallet_keyring::core::errors::Result;
use hdwallet_keyring::hardware::{HotplugEvent, LedgerUsbAdapter};
use hdwallet_keyring::keyring::{
    Capability, EventKind, EventSubscriber, Keyring, LifecycleEvent, LoggingSubscriber, RoutingPattern,
    TransportKind,
};
use hdwallet_keyring::path::Chain;
use hdwallet_keyring::provider::{InjectedProvider, InjectedProviderAdapter, ProviderDetector};
use hdwallet_keyring::KeyringConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use util::{ledger, MockDiscovery};

struct Extension;

#[async_trait]
impl InjectedProvider for Extension {
    fn name(&self) -> &str {
        "Tally Ho"
    }

    async fn request_accounts(&self) -> Result<Vec<String>> {
        Ok(vec!["0x00000000000000000000000000000000000000Aa".to_string()])
    }
}

struct Injected;

#[async_trait]
impl ProviderDetector for Injected {
    async fn detect(&self, _timeout: Duration) -> Result<Option<Arc<dyn InjectedProvider>>> {
        Ok(Some(Arc::new(Extension)))
    }
}

#[derive(Default)]
struct Recorder {
    keys: Mutex<Vec<String>>,
}

impl EventSubscriber for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_event(&self, event: &LifecycleEvent) {
        self.keys.lock().unwrap().push(event.key.to_string());
    }
}

#[tokio::test(start_paused = true)]
async fn test_adapters_share_one_registry() {
    let config = KeyringConfig::from_toml_str(
        r#"
        [hotplug]
        grace_window_ms = 500

        [provider]
        label = "Tally"
        "#,
    )
    .unwrap();

    let keyring = Arc::new(Keyring::new());
    let recorder = Arc::new(Recorder::default());
    keyring.subscribe(recorder.clone());
    keyring.subscribe(Arc::new(LoggingSubscriber::new("log")));

    let discovery = MockDiscovery::new();
    discovery.attach(ledger("0001"));
    let usb = LedgerUsbAdapter::use_keyring(keyring.clone(), discovery.clone(), &config);
    let injected = InjectedProviderAdapter::use_keyring(keyring.clone(), Arc::new(Injected), &config);

    usb.initialize(None).await.unwrap();
    injected.pair_device().await.unwrap();
    assert_eq!(injected.initialize().await, 2);

    let provider_id = "tally:0x00000000000000000000000000000000000000aa";
    assert_eq!(keyring.wallets(), vec!["0001".to_string(), provider_id.to_string()]);
    assert_eq!(
        keyring.get(provider_id).unwrap().transport_kind(),
        TransportKind::InjectedProvider
    );

    // Only the USB session can describe Cosmos-family paths.
    let ledger_session = keyring.get("0001").unwrap();
    assert!(ledger_session.supports(Capability::Chain(Chain::Kujira)));
    assert!(keyring.get(provider_id).unwrap().describe_path(Chain::Kujira, &[]).is_none());

    let eviction = usb.handle_event(HotplugEvent::Vanished(ledger("0001"))).unwrap();
    assert!(eviction.await.unwrap());
    assert_eq!(keyring.wallets(), vec![provider_id.to_string()]);

    assert_eq!(
        *recorder.keys.lock().unwrap(),
        vec![format!("Tally.{}.CONNECT", provider_id), "Ledger.0001.DISCONNECT".to_string()]
    );
}

#[tokio::test]
async fn test_dropped_channel_subscriber_is_pruned() {
    let keyring = Arc::new(Keyring::new());
    let discovery = MockDiscovery::new();
    let usb = LedgerUsbAdapter::use_keyring(keyring.clone(), discovery, &KeyringConfig::default());

    let rx = keyring.subscribe_channel(RoutingPattern::kind(EventKind::Connect));
    assert_eq!(keyring.events().subscriber_count(), 1);
    drop(rx);

    usb.handle_event(HotplugEvent::Appeared(ledger("0001")));
    assert_eq!(keyring.events().subscriber_count(), 0);
}

#[tokio::test]
async fn test_pattern_subscription_filters_by_device() {
    let keyring = Arc::new(Keyring::new());
    let usb = LedgerUsbAdapter::use_keyring(keyring.clone(), MockDiscovery::new(), &KeyringConfig::default());
    let mut rx = keyring.subscribe_channel(RoutingPattern::parse("*.0002.*"));

    usb.handle_event(HotplugEvent::Appeared(ledger("0001")));
    usb.handle_event(HotplugEvent::Appeared(ledger("0002")));

    let event = rx.try_recv().unwrap();
    assert_eq!(event.key.device_id(), "0002");
    assert!(rx.try_recv().is_err());
}
