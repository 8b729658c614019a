//! # Event Bus System
//!
//! Event-driven architecture for the web client core using
//! `tokio::sync::broadcast`. Modules emit typed events; any number of
//! subscribers (UI state, navigation, logging) listen independently.
//!
//! Emission is fire-and-forget: a bus with no subscribers is not an error,
//! and a slow subscriber observes `RecvError::Lagged` without blocking the
//! emitter.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! let _ = event_bus.emit(CoreEvent::Auth(AuthEvent::SignedOut));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Current-user identity events
    Identity(IdentityEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Identity(e) => e.description(),
        }
    }
}

/// Authentication state changes.
///
/// Event payloads never carry the credential itself; subscribers that need
/// the value read it from the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "data")]
pub enum AuthEvent {
    /// An access-credential refresh is in flight.
    TokenRefreshing,
    /// The refresh call settled successfully and the store holds a new
    /// credential.
    TokenRefreshed,
    /// The refresh call failed; the credential was cleared and the session
    /// has ended.
    RefreshFailed { reason: String },
    /// Local logout completed: credential cleared, identity invalidated.
    /// Navigation subscribers react to this.
    SignedOut,
    /// A credential change made by another context was adopted into this
    /// one. `present` is false when the other context logged out.
    CredentialAdopted { present: bool },
}

impl AuthEvent {
    pub fn description(&self) -> &'static str {
        match self {
            AuthEvent::TokenRefreshing => "Access credential refresh in flight",
            AuthEvent::TokenRefreshed => "Access credential refreshed",
            AuthEvent::RefreshFailed { .. } => "Access credential refresh failed",
            AuthEvent::SignedOut => "Signed out",
            AuthEvent::CredentialAdopted { .. } => "Adopted credential change from another context",
        }
    }
}

/// Current-user identity cache changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum IdentityEvent {
    /// A fresh identity record was cached.
    Updated,
    /// The cached identity was invalidated (logout or explicit clear).
    Cleared,
}

impl IdentityEvent {
    pub fn description(&self) -> &'static str {
        match self {
            IdentityEvent::Updated => "Identity cache updated",
            IdentityEvent::Cleared => "Identity cache cleared",
        }
    }
}

impl fmt::Display for CoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Central broadcast channel for core events.
///
/// Cheap to clone; clones share the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create an event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers the event reached. An error means
    /// there were no subscribers, which callers routinely ignore.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed)).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event, CoreEvent::Auth(AuthEvent::TokenRefreshed));
    }

    #[test]
    fn emit_without_subscribers_is_an_ignorable_error() {
        let bus = EventBus::new(16);
        assert!(bus.emit(CoreEvent::Auth(AuthEvent::SignedOut)).is_err());
    }

    #[tokio::test]
    async fn subscribers_receive_independently() {
        let bus = EventBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(CoreEvent::Identity(IdentityEvent::Cleared)).unwrap();

        assert_eq!(
            a.recv().await.unwrap(),
            CoreEvent::Identity(IdentityEvent::Cleared)
        );
        assert_eq!(
            b.recv().await.unwrap(),
            CoreEvent::Identity(IdentityEvent::Cleared)
        );
    }

    #[test]
    fn event_serialization_round_trips() {
        let event = CoreEvent::Auth(AuthEvent::CredentialAdopted { present: false });
        let json = serde_json::to_string(&event).unwrap();
        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
