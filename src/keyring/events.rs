//! Lifecycle event bus
//!
//! Events are routed by a segmented key `[label, device_id, kind]` and
//! delivered synchronously, in subscription order, to every subscriber whose
//! pattern matches. No history is kept.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::errors::KeyringError;

/// Session state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Connect,
    Disconnect,
    Failure,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connect => "CONNECT",
            EventKind::Disconnect => "DISCONNECT",
            EventKind::Failure => "FAILURE",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "CONNECT" => Some(EventKind::Connect),
            "DISCONNECT" => Some(EventKind::Disconnect),
            "FAILURE" => Some(EventKind::Failure),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing key: manufacturer/provider label, device identifier, event kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingKey(Vec<String>);

impl RoutingKey {
    pub fn new(label: impl Into<String>, device_id: impl Into<String>, kind: EventKind) -> Self {
        Self(vec![label.into(), device_id.into(), kind.as_str().to_string()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn label(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn device_id(&self) -> &str {
        self.0.get(1).map(String::as_str).unwrap_or_default()
    }

    pub fn kind(&self) -> Option<EventKind> {
        self.0.last().and_then(|s| EventKind::from_segment(s))
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    /// `*`: exactly one segment
    One,
    /// `**`: any number of segments
    Rest,
}

/// Subscription filter over routing keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPattern(Vec<PatternSegment>);

impl RoutingPattern {
    /// Matches every key
    pub fn all() -> Self {
        Self(vec![PatternSegment::Rest])
    }

    /// Build from segments; `*` and `**` are wildcards.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            segments
                .into_iter()
                .map(|s| match s.as_ref() {
                    "*" => PatternSegment::One,
                    "**" => PatternSegment::Rest,
                    literal => PatternSegment::Literal(literal.to_string()),
                })
                .collect(),
        )
    }

    /// Parse a dotted pattern such as `Ledger.*.CONNECT`.
    pub fn parse(pattern: &str) -> Self {
        Self::new(pattern.split('.'))
    }

    /// Every event of one kind
    pub fn kind(kind: EventKind) -> Self {
        Self::new(["*", "*", kind.as_str()])
    }

    /// Every event for one device
    pub fn device(device_id: &str) -> Self {
        Self::new(["*", device_id, "*"])
    }

    pub fn matches(&self, key: &RoutingKey) -> bool {
        match_segments(&self.0, key.segments())
    }
}

fn match_segments(pattern: &[PatternSegment], key: &[String]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((PatternSegment::Rest, rest)) => {
            (0..=key.len()).any(|skip| match_segments(rest, &key[skip..]))
        }
        Some((PatternSegment::One, rest)) => {
            !key.is_empty() && match_segments(rest, &key[1..])
        }
        Some((PatternSegment::Literal(lit), rest)) => {
            key.first() == Some(lit) && match_segments(rest, &key[1..])
        }
    }
}

/// Error details carried by FAILURE events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl From<&KeyringError> for ErrorPayload {
    fn from(err: &KeyringError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    /// Device identifier on connect/disconnect
    Device(String),
    Failure {
        device_id: Option<String>,
        error: ErrorPayload,
    },
}

impl EventPayload {
    pub fn device_id(&self) -> Option<&str> {
        match self {
            EventPayload::Device(id) => Some(id),
            EventPayload::Failure { device_id, .. } => device_id.as_deref(),
        }
    }
}

/// One published notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub key: RoutingKey,
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

/// Event subscriber
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);

    fn name(&self) -> &str;

    /// Keys this subscriber receives. Defaults to all.
    fn pattern(&self) -> RoutingPattern {
        RoutingPattern::all()
    }

    /// Closed subscribers are dropped after the next publish.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Synchronous, in-order event bus
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Arc<dyn EventSubscriber>>>,
    next_channel_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.lock().push(subscriber);
    }

    /// Subscribe through an unbounded channel. The subscription ends when the
    /// receiver is dropped.
    pub fn subscribe_channel(&self, pattern: RoutingPattern) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_channel_id.fetch_add(1, Ordering::Relaxed);
        self.subscribe(Arc::new(ChannelSubscriber {
            name: format!("channel-{}", id),
            pattern,
            sender: tx,
        }));
        rx
    }

    pub fn unsubscribe(&self, subscriber_name: &str) {
        self.subscribers.lock().retain(|s| s.name() != subscriber_name);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Deliver `event` to every matching subscriber before returning.
    pub fn publish(&self, event: LifecycleEvent) {
        // Snapshot so subscribers may (un)subscribe or publish re-entrantly.
        let subscribers: Vec<_> = self.subscribers.lock().clone();

        let mut saw_closed = false;
        for subscriber in &subscribers {
            if subscriber.is_closed() {
                saw_closed = true;
                continue;
            }
            if subscriber.pattern().matches(&event.key) {
                subscriber.on_event(&event);
            }
        }

        if saw_closed {
            self.subscribers.lock().retain(|s| !s.is_closed());
        }
    }
}

struct ChannelSubscriber {
    name: String,
    pattern: RoutingPattern,
    sender: mpsc::UnboundedSender<LifecycleEvent>,
}

impl EventSubscriber for ChannelSubscriber {
    fn on_event(&self, event: &LifecycleEvent) {
        let _ = self.sender.send(event.clone());
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> RoutingPattern {
        self.pattern.clone()
    }

    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Writes every lifecycle event to the log
pub struct LoggingSubscriber {
    name: String,
}

impl LoggingSubscriber {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EventSubscriber for LoggingSubscriber {
    fn on_event(&self, event: &LifecycleEvent) {
        use tracing::{info, warn};

        match &event.payload {
            EventPayload::Device(device_id) => {
                info!(key = %event.key, device_id = %device_id, "Keyring lifecycle event");
            }
            EventPayload::Failure { device_id, error } => {
                warn!(
                    key = %event.key,
                    device_id = device_id.as_deref().unwrap_or("<unknown>"),
                    code = %error.code,
                    error = %error.message,
                    "Keyring lifecycle failure"
                );
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
