//! Keyring session registry
//!
//! Process-wide map from device identifier to wallet session, plus the
//! lifecycle event bus every adapter publishes on. Construct one `Keyring`
//! at startup and hand an `Arc` of it to each adapter.

pub mod events;
pub mod session;

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use events::{
    ErrorPayload, EventBus, EventKind, EventPayload, EventSubscriber, LifecycleEvent,
    LoggingSubscriber, RoutingKey, RoutingPattern,
};
pub use session::{Capability, SessionHandle, TransportKind, WalletSession};

#[derive(Default)]
struct Registry {
    wallets: BTreeMap<String, SessionHandle>,
    /// alias -> device id
    aliases: BTreeMap<String, String>,
}

impl Registry {
    fn resolve<'a>(&'a self, device_id: &'a str) -> &'a str {
        match self.aliases.get(device_id) {
            Some(target) if self.wallets.contains_key(target) => target,
            _ => device_id,
        }
    }
}

/// Session registry
///
/// Mutations are atomic with respect to readers; the lock is never held
/// across an await.
#[derive(Default)]
pub struct Keyring {
    state: RwLock<Registry>,
    events: EventBus,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under `device_id`, replacing any existing entry.
    ///
    /// The superseded session is returned untouched; callers wanting a clean
    /// teardown should `remove` first.
    pub fn add(&self, session: SessionHandle, device_id: impl Into<String>) -> Option<SessionHandle> {
        let device_id = device_id.into();
        let previous = self.state.write().wallets.insert(device_id.clone(), session);
        if previous.is_some() {
            warn!(device_id = %device_id, "Replaced existing keyring session");
        } else {
            info!(device_id = %device_id, "Added keyring session");
        }
        previous
    }

    /// Make `alias` resolve to `device_id` for `get` and `remove`.
    pub fn add_alias(&self, device_id: impl Into<String>, alias: impl Into<String>) {
        let mut state = self.state.write();
        state.aliases.insert(alias.into(), device_id.into());
    }

    pub fn get(&self, device_id: &str) -> Option<SessionHandle> {
        let state = self.state.read();
        state.wallets.get(state.resolve(device_id)).cloned()
    }

    /// Any registered session (the one with the smallest identifier).
    pub fn first(&self) -> Option<SessionHandle> {
        self.state.read().wallets.values().next().cloned()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.get(device_id).is_some()
    }

    /// Remove the session for `device_id` and disconnect it.
    ///
    /// Returns `false` when nothing was registered. Disconnect failures are
    /// logged, never returned.
    pub async fn remove(&self, device_id: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            let target = state.resolve(device_id).to_string();
            let session = state.wallets.remove(&target);
            if session.is_some() {
                state.aliases.retain(|alias, to| alias != device_id && to != &target);
            }
            session.map(|s| (target, s))
        };

        let Some((target, session)) = removed else {
            debug!(device_id = %device_id, "Remove ignored, no session");
            return false;
        };

        if let Err(e) = session.disconnect().await {
            warn!(device_id = %target, error = %e, "Session disconnect failed during removal");
        }
        info!(device_id = %target, "Removed keyring session");
        true
    }

    /// Remove every session and alias.
    pub async fn remove_all(&self) {
        let sessions: Vec<_> = {
            let mut state = self.state.write();
            state.aliases.clear();
            std::mem::take(&mut state.wallets).into_iter().collect()
        };

        for (device_id, session) in sessions {
            if let Err(e) = session.disconnect().await {
                warn!(device_id = %device_id, error = %e, "Session disconnect failed during removal");
            }
        }
    }

    /// Registered device identifiers, sorted.
    pub fn wallets(&self) -> Vec<String> {
        self.state.read().wallets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Publish a lifecycle event to every matching subscriber.
    pub fn emit(&self, key: RoutingKey, payload: EventPayload) {
        debug!(key = %key, "Emitting keyring event");
        self.events.publish(LifecycleEvent {
            key,
            payload,
            timestamp: Utc::now(),
        });
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.events.subscribe(subscriber);
    }

    pub fn subscribe_channel(&self, pattern: RoutingPattern) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        self.events.subscribe_channel(pattern)
    }

    pub fn unsubscribe(&self, subscriber_name: &str) {
        self.events.unsubscribe(subscriber_name);
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}
