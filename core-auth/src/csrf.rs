//! Anti-Forgery Readiness Gate
//!
//! Mutating calls are only safe once the anti-forgery token has been
//! fetched (the server plants it as a cookie on the fetch response). The
//! gate primes it exactly once per process: concurrent callers share a
//! single fetch, and a failed fetch leaves the gate unprimed so a later
//! caller can try again.
//!
//! The anti-forgery path is on the public allow-list — the fetch never
//! carries the access credential.

use crate::error::{AuthError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::ApiConfig;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

pub struct CsrfGate {
    http: Arc<dyn HttpClient>,
    config: Arc<ApiConfig>,
    primed: OnceCell<()>,
}

impl CsrfGate {
    pub fn new(http: Arc<dyn HttpClient>, config: Arc<ApiConfig>) -> Self {
        Self {
            http,
            config,
            primed: OnceCell::new(),
        }
    }

    /// Wait until the anti-forgery token has been primed, fetching it if
    /// nobody has yet.
    ///
    /// # Errors
    ///
    /// [`AuthError::Transport`] when the fetch could not be issued,
    /// [`AuthError::CsrfUnavailable`] when the endpoint answered with an
    /// error status. Either way the gate stays unprimed.
    #[instrument(skip(self))]
    pub async fn ensure_ready(&self) -> Result<()> {
        self.primed
            .get_or_try_init(|| async {
                debug!("Priming anti-forgery token");
                let request = HttpRequest::new(HttpMethod::Get, self.config.csrf_url())
                    .header("Accept", "application/json");
                let response = self.http.execute(request).await?;

                if response.is_success() {
                    info!("Anti-forgery token primed");
                    Ok(())
                } else {
                    warn!(
                        status = response.status,
                        "Anti-forgery endpoint rejected the fetch"
                    );
                    Err(AuthError::CsrfUnavailable {
                        status: response.status,
                    })
                }
            })
            .await
            .map(|_| ())
    }

    /// Whether the gate has been primed.
    pub fn is_ready(&self) -> bool {
        self.primed.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::watch;

    /// Transport whose response status can be flipped between calls, with a
    /// release gate for concurrency tests.
    struct FlippableTransport {
        calls: AtomicUsize,
        status: AtomicU16,
        gate: watch::Receiver<bool>,
    }

    impl FlippableTransport {
        fn new(status: u16, open: bool) -> (Arc<Self>, watch::Sender<bool>) {
            let (tx, rx) = watch::channel(open);
            (
                Arc::new(Self {
                    calls: AtomicUsize::new(0),
                    status: AtomicU16::new(status),
                    gate: rx,
                }),
                tx,
            )
        }
    }

    #[async_trait]
    impl HttpClient for FlippableTransport {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut gate = self.gate.clone();
            let _ = gate.wait_for(|open| *open).await;
            Ok(HttpResponse {
                status: self.status.load(Ordering::SeqCst),
                headers: HashMap::new(),
                body: Bytes::new(),
            })
        }
    }

    fn gate_with(transport: Arc<FlippableTransport>) -> Arc<CsrfGate> {
        let config = Arc::new(
            ApiConfig::builder()
                .base_url("https://app.example.com")
                .build()
                .unwrap(),
        );
        Arc::new(CsrfGate::new(transport, config))
    }

    #[tokio::test]
    async fn priming_succeeds_once_and_is_cached() {
        let (transport, _release) = FlippableTransport::new(204, true);
        let gate = gate_with(transport.clone());

        assert!(!gate.is_ready());
        gate.ensure_ready().await.unwrap();
        assert!(gate.is_ready());

        // Subsequent calls are free.
        gate.ensure_ready().await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let (transport, release) = FlippableTransport::new(200, false);
        let gate = gate_with(transport.clone());

        let mut handles = Vec::new();
        for _ in 0..5 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move { gate.ensure_ready().await }));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        release.send_replace(true);

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_priming_can_be_retried() {
        let (transport, _release) = FlippableTransport::new(503, true);
        let gate = gate_with(transport.clone());

        let err = gate.ensure_ready().await.unwrap_err();
        assert!(matches!(err, AuthError::CsrfUnavailable { status: 503 }));
        assert!(!gate.is_ready());

        // The endpoint recovers; the next call primes the gate.
        transport.status.store(200, Ordering::SeqCst);
        gate.ensure_ready().await.unwrap();
        assert!(gate.is_ready());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
