//! Credential Storage Abstraction
//!
//! One durable slot holding the access credential string, shared by every
//! browsing-context analog of the application (window, process, test). The
//! contract is a last-writer-wins broadcast: any mutation — local or from
//! another context — is observable through the [`TokenStorage::watch`]
//! channel, so contexts mirror each other without polling.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;

/// Durable storage for the access credential.
///
/// Implementations back the slot with whatever the platform offers (a file,
/// a keychain entry, plain memory for tests). Two instances pointing at the
/// same underlying slot model two browsing contexts of the same origin.
///
/// # Change notification
///
/// `watch` returns a receiver that always reflects the latest stored value,
/// including values written by other contexts. `None` means the slot is
/// empty — the credential was cleared, possibly because another context
/// logged out. Implementations must publish every observed change; they may
/// also echo the context's own writes (adoption of an identical value is
/// harmless).
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Read the currently stored credential, if any.
    async fn load(&self) -> Result<Option<String>>;

    /// Write the credential, replacing any previous value.
    async fn persist(&self, value: &str) -> Result<()>;

    /// Remove the credential. Idempotent: removing an empty slot succeeds.
    async fn remove(&self) -> Result<()>;

    /// Subscribe to credential changes (last-writer-wins).
    fn watch(&self) -> watch::Receiver<Option<String>>;
}
