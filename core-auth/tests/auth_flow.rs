//! End-to-end behavior of the credential store, refresh coordinator, and
//! authorized dispatcher wired together over an in-process transport and
//! shared storage.

use async_trait::async_trait;
use bridge_desktop::MemoryTokenStorage;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_auth::{AccessToken, AuthorizedClient, CredentialStore, RefreshCoordinator};
use core_runtime::config::ApiConfig;
use core_runtime::events::EventBus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// In-process API double.
///
/// Protected endpoints answer `401` + expiry marker for the stale bearer
/// and `200` for the fresh one. The refresh endpoint is held behind a gate
/// so a test can park every caller mid-refresh, and its outcome (new
/// credential or `500`) is scripted per test.
struct ApiDouble {
    refresh_gate: watch::Receiver<bool>,
    refresh_succeeds: bool,
    refresh_calls: AtomicUsize,
    api_requests: Mutex<Vec<HttpRequest>>,
}

impl ApiDouble {
    fn new(refresh_succeeds: bool) -> (Arc<Self>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (
            Arc::new(Self {
                refresh_gate: rx,
                refresh_succeeds,
                refresh_calls: AtomicUsize::new(0),
                api_requests: Mutex::new(Vec::new()),
            }),
            tx,
        )
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn api_requests(&self) -> Vec<HttpRequest> {
        self.api_requests.lock().unwrap().clone()
    }
}

fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: Bytes::from(body.to_string()),
    }
}

#[async_trait]
impl HttpClient for ApiDouble {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if request.url.contains("/api/auth/refresh") {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            let mut gate = self.refresh_gate.clone();
            let _ = gate.wait_for(|open| *open).await;
            return Ok(if self.refresh_succeeds {
                response(200, &[], r#"{"access_token":"fresh-token"}"#)
            } else {
                response(500, &[], "refresh unavailable")
            });
        }

        self.api_requests.lock().unwrap().push(request.clone());
        match request.headers.get("Authorization").map(|s| s.as_str()) {
            Some("Bearer fresh-token") => Ok(response(200, &[], r#"{"ok":true}"#)),
            _ => Ok(response(401, &[("x-token-expired", "true")], "")),
        }
    }
}

struct Harness {
    client: Arc<AuthorizedClient>,
    store: CredentialStore,
    events: EventBus,
}

fn harness(transport: Arc<ApiDouble>, storage: Arc<MemoryTokenStorage>) -> Harness {
    let events = EventBus::new(64);
    let store = CredentialStore::new(storage, events.clone());
    let config = Arc::new(
        ApiConfig::builder()
            .base_url("https://app.example.com")
            .build()
            .unwrap(),
    );
    let refresher = Arc::new(RefreshCoordinator::new(
        store.clone(),
        transport.clone(),
        config.clone(),
        events.clone(),
    ));
    let client = Arc::new(AuthorizedClient::new(
        transport,
        store.clone(),
        refresher,
        config,
    ));
    Harness {
        client,
        store,
        events,
    }
}

#[tokio::test]
async fn concurrent_expiring_requests_share_one_refresh() {
    let (transport, release) = ApiDouble::new(true);
    let harness = harness(transport.clone(), Arc::new(MemoryTokenStorage::new()));
    harness.store.set(AccessToken::new("stale-token")).await;

    const N: usize = 10;
    let mut handles = Vec::new();
    for i in 0..N {
        let client = harness.client.clone();
        handles.push(tokio::spawn(async move {
            client.get(format!("/api/posts/{}", i)).await
        }));
    }

    // Every task issues attempt 1 with the stale credential, observes the
    // expiry signal, and parks on the gated refresh.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.refresh_calls(), 1, "refresh was not deduplicated");

    release.send_replace(true);
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.status, 200);
    }

    // Exactly one refresh; every request retried with the same fresh
    // credential.
    assert_eq!(transport.refresh_calls(), 1);
    let api_requests = transport.api_requests();
    assert_eq!(api_requests.len(), 2 * N);
    let fresh_retries = api_requests
        .iter()
        .filter(|r| r.headers.get("Authorization").map(|s| s.as_str()) == Some("Bearer fresh-token"))
        .count();
    assert_eq!(fresh_retries, N);
    assert_eq!(harness.store.read(), Some(AccessToken::new("fresh-token")));
}

#[tokio::test]
async fn concurrent_expiring_requests_all_get_their_401_when_refresh_fails() {
    let (transport, release) = ApiDouble::new(false);
    let harness = harness(transport.clone(), Arc::new(MemoryTokenStorage::new()));
    harness.store.set(AccessToken::new("stale-token")).await;

    const N: usize = 6;
    let mut handles = Vec::new();
    for i in 0..N {
        let client = harness.client.clone();
        handles.push(tokio::spawn(async move {
            client.get(format!("/api/posts/{}", i)).await
        }));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    release.send_replace(true);

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        // The original expiry response, unchanged.
        assert_eq!(result.status, 401);
        assert_eq!(result.header("x-token-expired"), Some("true"));
    }

    // One refresh, no retries, credential gone.
    assert_eq!(transport.refresh_calls(), 1);
    assert_eq!(transport.api_requests().len(), N);
    assert_eq!(harness.store.read(), None);
}

#[tokio::test]
async fn refresh_outcome_propagates_to_a_second_context() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let (transport, release) = ApiDouble::new(true);
    release.send_replace(true);

    let context_a = harness(transport.clone(), storage.clone());
    context_a.store.set(AccessToken::new("stale-token")).await;

    let context_b = harness(transport.clone(), storage);
    assert_eq!(
        context_b.store.read(),
        Some(AccessToken::new("stale-token"))
    );
    let mut events_b = context_b.events.subscribe();

    // Context A hits the expiry signal and refreshes; context B adopts the
    // fresh credential from shared storage without issuing anything.
    let result = context_a.client.get("/api/posts/1").await.unwrap();
    assert_eq!(result.status, 200);

    tokio::time::timeout(Duration::from_secs(5), events_b.recv())
        .await
        .expect("context B never observed the change")
        .unwrap();
    assert_eq!(
        context_b.store.read(),
        Some(AccessToken::new("fresh-token"))
    );
}

#[tokio::test]
async fn requests_after_a_refresh_use_the_new_credential_without_refreshing_again() {
    let (transport, release) = ApiDouble::new(true);
    release.send_replace(true);
    let harness = harness(transport.clone(), Arc::new(MemoryTokenStorage::new()));
    harness.store.set(AccessToken::new("stale-token")).await;

    let first = harness.client.get("/api/posts/1").await.unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(transport.refresh_calls(), 1);

    // The store now holds the fresh credential; later requests succeed on
    // attempt 1.
    let second = harness.client.get("/api/posts/2").await.unwrap();
    assert_eq!(second.status, 200);
    assert_eq!(transport.refresh_calls(), 1);
}
