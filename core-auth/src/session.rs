//! Session Lifecycle
//!
//! Sign-in records a credential obtained by an external login flow;
//! sign-out tells the server best-effort and then clears local state
//! unconditionally. Client-side logout is authoritative: a dead network or
//! an unhappy server never leaves this context signed in.
//!
//! Navigation after logout is not this crate's concern — routing layers
//! subscribe to [`AuthEvent::SignedOut`] on the event bus.

use crate::client::{ApiRequest, AuthorizedClient};
use crate::identity::IdentityCache;
use crate::store::CredentialStore;
use crate::types::AccessToken;
use core_runtime::config::ApiConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct SessionManager {
    client: Arc<AuthorizedClient>,
    store: CredentialStore,
    identity: Arc<IdentityCache>,
    config: Arc<ApiConfig>,
    events: EventBus,
}

impl SessionManager {
    pub fn new(
        client: Arc<AuthorizedClient>,
        store: CredentialStore,
        identity: Arc<IdentityCache>,
        config: Arc<ApiConfig>,
        events: EventBus,
    ) -> Self {
        Self {
            client,
            store,
            identity,
            config,
            events,
        }
    }

    /// Record a credential obtained by an external login flow.
    pub async fn sign_in(&self, token: AccessToken) {
        self.store.set(token).await;
        info!("Signed in");
    }

    /// End the session.
    ///
    /// The logout endpoint is notified best-effort — a rejection or a
    /// transport failure is logged and otherwise ignored — and the local
    /// credential and identity cache are cleared regardless, then
    /// [`AuthEvent::SignedOut`] is emitted.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        match self
            .client
            .dispatch(ApiRequest::post(self.config.logout_path()))
            .await
        {
            Ok(response) if response.is_success() => {
                debug!("Logout acknowledged by server");
            }
            Ok(response) => {
                warn!(
                    status = response.status,
                    "Logout endpoint rejected the request"
                );
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed");
            }
        }

        self.store.clear().await;
        self.identity.invalidate();
        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut));
        info!("Signed out locally");
    }
}
