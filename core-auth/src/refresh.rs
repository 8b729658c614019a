//! Refresh Coordinator
//!
//! Guarantees at most one outstanding call to the session-refresh endpoint,
//! however many callers ask for a refresh concurrently. The first caller in
//! `Idle` state becomes the leader and issues the single network call; every
//! caller that arrives while the state is `Refreshing` registers a oneshot
//! waiter and shares the leader's outcome.
//!
//! The state mutex is held only across state transitions, never across an
//! await — mutual exclusion between "check state" and "mutate state" is
//! structural.
//!
//! On success the new credential is written through the
//! [`CredentialStore`]; on any failure (non-2xx, missing credential field,
//! transport error) the store is cleared. Either way every waiter resolves
//! exactly once, and callers receiving `None` must treat the session as
//! ended rather than retry the refresh themselves.

use crate::store::CredentialStore;
use crate::types::AccessToken;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::ApiConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

/// JSON body of the refresh endpoint. The credential field has shipped
/// under two spellings; both remain accepted.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "accessToken")]
    access_token: Option<String>,
}

enum RefreshState {
    Idle,
    Refreshing(Vec<oneshot::Sender<Option<AccessToken>>>),
}

/// Deduplicating coordinator for the session-refresh call.
///
/// Owned state rather than ambient globals: independent coordinators can
/// coexist (one per tenant, one per test) and everything is injected.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: CredentialStore,
    http: Arc<dyn HttpClient>,
    config: Arc<ApiConfig>,
    events: EventBus,
}

impl RefreshCoordinator {
    pub fn new(
        store: CredentialStore,
        http: Arc<dyn HttpClient>,
        config: Arc<ApiConfig>,
        events: EventBus,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            store,
            http,
            config,
            events,
        }
    }

    /// Obtain a fresh credential, sharing any refresh already in flight.
    ///
    /// Returns `Some(token)` when the single underlying call succeeded and
    /// the store holds the new credential, `None` when it failed and the
    /// store was cleared. Every concurrent caller observes the same
    /// outcome.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Option<AccessToken> {
        match self.join_or_lead() {
            Some(rx) => {
                // A refresh is already in flight; await its outcome. A
                // dropped sender means the leader was cancelled — that
                // settles as failure.
                rx.await.unwrap_or(None)
            }
            None => {
                let _ = self
                    .events
                    .emit(CoreEvent::Auth(AuthEvent::TokenRefreshing));
                let guard = SettleGuard {
                    coordinator: self,
                    settled: false,
                };
                let outcome = self.execute_refresh().await;
                guard.settle(outcome.clone());
                outcome
            }
        }
    }

    /// Transition `Idle -> Refreshing` (becoming the leader, `None`) or
    /// register as a waiter on the in-flight refresh (`Some(receiver)`).
    fn join_or_lead(&self) -> Option<oneshot::Receiver<Option<AccessToken>>> {
        let mut state = self.lock_state();
        match &mut *state {
            RefreshState::Refreshing(waiters) => {
                debug!("Refresh already in flight; awaiting shared outcome");
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Some(rx)
            }
            RefreshState::Idle => {
                *state = RefreshState::Refreshing(Vec::new());
                None
            }
        }
    }

    /// Issue the single refresh call and apply its outcome to the store.
    async fn execute_refresh(&self) -> Option<AccessToken> {
        info!("Refreshing access credential");

        // Ambient session cookies ride along via the transport; the expired
        // access credential is deliberately not attached.
        let request = HttpRequest::new(HttpMethod::Post, self.config.refresh_url())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Refresh request failed");
                return self.fail("transport failure").await;
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "Refresh endpoint returned an error");
            return self.fail("refresh endpoint error").await;
        }

        let credential = response
            .json::<RefreshResponse>()
            .ok()
            .and_then(|body| body.access_token)
            .filter(|token| !token.is_empty());

        let Some(credential) = credential else {
            warn!("Refresh response carried no credential");
            return self.fail("missing credential in refresh response").await;
        };

        let token = AccessToken::new(credential);
        self.store.set(token.clone()).await;
        info!("Access credential refreshed");
        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed));
        Some(token)
    }

    /// Failed refresh: the session is over. Clear the credential so no
    /// further request attaches it, and report the reason.
    async fn fail(&self, reason: &str) -> Option<AccessToken> {
        self.store.clear().await;
        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::RefreshFailed {
            reason: reason.to_string(),
        }));
        None
    }

    /// Return to `Idle` and hand the registered waiters back to the caller.
    fn take_waiters(&self) -> Vec<oneshot::Sender<Option<AccessToken>>> {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing(waiters) => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Settles the in-flight refresh exactly once. If the leader is cancelled
/// before settling, dropping the guard drains the waiters without sending —
/// their receivers observe the closed channel as failure.
struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(mut self, outcome: Option<AccessToken>) {
        self.settled = true;
        for waiter in self.coordinator.take_waiters() {
            // A waiter that gave up awaiting is fine to miss.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            drop(self.coordinator.take_waiters());
        }
    }
}
