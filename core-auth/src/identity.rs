//! Current-User Identity Cache
//!
//! Holds the last-fetched [`UserIdentity`] so screens don't refetch the
//! profile on every render. The cache is independent of the credential
//! machinery except for one contract: it is invalidated on logout.

use crate::types::UserIdentity;
use core_runtime::events::{CoreEvent, EventBus, IdentityEvent};
use std::sync::RwLock;
use tracing::debug;

pub struct IdentityCache {
    current: RwLock<Option<UserIdentity>>,
    events: EventBus,
}

impl IdentityCache {
    pub fn new(events: EventBus) -> Self {
        Self {
            current: RwLock::new(None),
            events,
        }
    }

    /// The cached identity, if any. Never blocks on the network.
    pub fn get(&self) -> Option<UserIdentity> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Cache a freshly fetched identity.
    pub fn store(&self, identity: UserIdentity) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(identity);
        drop(guard);
        debug!("Identity cache updated");
        let _ = self
            .events
            .emit(CoreEvent::Identity(IdentityEvent::Updated));
    }

    /// Drop the cached identity. Idempotent; emits only when something was
    /// actually cleared.
    pub fn invalidate(&self) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let was_present = guard.take().is_some();
        drop(guard);
        if was_present {
            debug!("Identity cache cleared");
            let _ = self
                .events
                .emit(CoreEvent::Identity(IdentityEvent::Cleared));
        }
    }
}
