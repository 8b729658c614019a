//! Credential Store
//!
//! Single source of truth for the access credential within one context
//! (window, process, test), with cross-context synchronization.
//!
//! The in-memory value and the durable copy move together on every
//! mutation. Changes made by another context arrive through the storage
//! watch channel and are adopted into memory without polling; an adopted
//! `None` means the other context logged out. Reads never block and never
//! touch storage.

use crate::types::AccessToken;
use bridge_traits::storage::TokenStorage;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Shared handle to the credential slot. Cheap to clone.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    current: RwLock<Option<AccessToken>>,
    storage: Arc<dyn TokenStorage>,
    events: EventBus,
}

impl CredentialStore {
    /// Build the store, seed memory from the durable slot, and start
    /// mirroring changes published by other contexts.
    ///
    /// Must be called within a tokio runtime (the mirror task is spawned
    /// here).
    pub fn new(storage: Arc<dyn TokenStorage>, events: EventBus) -> Self {
        let mut rx = storage.watch();
        let seed = rx.borrow_and_update().clone().map(AccessToken::new);

        let inner = Arc::new(StoreInner {
            current: RwLock::new(seed),
            storage,
            events,
        });

        // The mirror task holds only a weak handle so dropping the last
        // store shuts it down; the storage side shuts it down by dropping
        // the watch sender.
        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let value = rx.borrow_and_update().clone().map(AccessToken::new);
                let Some(inner) = weak.upgrade() else { break };
                inner.adopt(value);
            }
        });

        Self { inner }
    }

    /// Current in-memory credential. Never blocks on storage.
    pub fn read(&self) -> Option<AccessToken> {
        self.inner.snapshot()
    }

    /// Whether a credential is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.inner.snapshot().is_some()
    }

    /// Store a new credential.
    ///
    /// The in-memory value is updated unconditionally; a persistence
    /// failure is logged and swallowed, leaving this context authenticated
    /// even if other contexts will not observe the change.
    pub async fn set(&self, token: AccessToken) {
        self.inner.replace(Some(token.clone()));
        if let Err(e) = self.inner.storage.persist(token.as_str()).await {
            warn!(error = %e, "Failed to persist credential; keeping in-memory value");
        }
    }

    /// Drop the credential from memory and durable storage. Idempotent.
    pub async fn clear(&self) {
        self.inner.replace(None);
        if let Err(e) = self.inner.storage.remove().await {
            warn!(error = %e, "Failed to clear durable credential");
        }
    }
}

impl StoreInner {
    fn snapshot(&self) -> Option<AccessToken> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace(&self, value: Option<AccessToken>) -> Option<AccessToken> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, value)
    }

    /// Mirror a value observed on the storage watch channel into memory.
    /// Writes from this context echo back here with an identical value and
    /// are filtered out by the equality check.
    fn adopt(&self, value: Option<AccessToken>) {
        let present = value.is_some();
        let previous = self.replace(value.clone());
        if previous != value {
            debug!(present, "Adopted credential change from another context");
            let _ = self
                .events
                .emit(CoreEvent::Auth(AuthEvent::CredentialAdopted { present }));
        }
    }
}
