//! Authorized Request Dispatcher
//!
//! Wraps outbound API requests: attaches the stored credential to protected
//! endpoints, recognizes the credential-expiry signal (`401` plus the expiry
//! marker header), and transparently refreshes-and-retries exactly once
//! through the shared [`RefreshCoordinator`].
//!
//! Anything that is not the expiry signal — an ordinary `401`, any other
//! error status, a transport failure — is surfaced to the caller untouched.
//! The dispatcher never reinterprets server answers.

use crate::error::{AuthError, Result};
use crate::refresh::RefreshCoordinator;
use crate::store::CredentialStore;
use crate::types::AccessToken;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_runtime::config::ApiConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Request descriptor handed to the dispatcher.
///
/// The target may be a path (resolved against the configured base URL) or an
/// absolute URL. Descriptors are plain data: they are rebuilt into transport
/// requests per attempt, so a retry can never inherit a stale authorization
/// header.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: HttpMethod,
    target: String,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, target)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| AuthError::InvalidRequest(format!("JSON body: {}", e)))?;
        self.body = Some(Bytes::from(bytes));
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        Ok(self)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }
}

/// Credential-aware API client.
///
/// All collaborators are injected; independent clients (per tenant, per
/// test) can coexist without shared ambient state.
pub struct AuthorizedClient {
    http: Arc<dyn HttpClient>,
    store: CredentialStore,
    refresher: Arc<RefreshCoordinator>,
    config: Arc<ApiConfig>,
}

impl AuthorizedClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        store: CredentialStore,
        refresher: Arc<RefreshCoordinator>,
        config: Arc<ApiConfig>,
    ) -> Self {
        Self {
            http,
            store,
            refresher,
            config,
        }
    }

    /// Dispatch a request, recovering from credential expiry at most once.
    ///
    /// Public endpoints (the session-refresh and anti-forgery paths) never
    /// carry the stored credential. For protected endpoints, a `401` with
    /// the expiry marker header triggers the shared refresh; a new
    /// credential yields exactly one retry, and a failed refresh yields the
    /// original response unchanged.
    ///
    /// # Errors
    ///
    /// [`AuthError::Transport`] when no response could be obtained. Error
    /// statuses are not errors; they come back as ordinary responses.
    #[instrument(skip(self, request), fields(method = request.method.as_str(), target = %request.target))]
    pub async fn dispatch(&self, request: ApiRequest) -> Result<HttpResponse> {
        let url = self.config.resolve(&request.target);
        let public = self.config.is_public(&request.target);
        let token = if public { None } else { self.store.read() };

        let first = self.send(&request, &url, token.as_ref()).await?;

        // Only the expiry signal on a protected request that actually
        // carried a credential is recoverable.
        if token.is_none() || !self.signals_expiry(&first) {
            return Ok(first);
        }

        debug!("Access credential expired; coordinating refresh");
        match self.refresher.refresh().await {
            Some(fresh) => {
                debug!("Retrying original request with refreshed credential");
                // Whatever the retry yields — success or failure — is the
                // final answer; there is no second refresh.
                self.send(&request, &url, Some(&fresh)).await
            }
            // Refresh failed: the store is already cleared. The caller gets
            // the original expiry response, not a synthesized error.
            None => Ok(first),
        }
    }

    /// Force a credential refresh outside the dispatch path (e.g. an eager
    /// refresh on startup). Deduplicated with any in-flight refresh.
    pub async fn refresh_credential(&self) -> Result<AccessToken> {
        self.refresher
            .refresh()
            .await
            .ok_or(AuthError::RefreshFailed)
    }

    pub async fn get(&self, target: impl Into<String>) -> Result<HttpResponse> {
        self.dispatch(ApiRequest::get(target)).await
    }

    pub async fn post<T: Serialize>(
        &self,
        target: impl Into<String>,
        body: &T,
    ) -> Result<HttpResponse> {
        self.dispatch(ApiRequest::post(target).json(body)?).await
    }

    pub async fn put<T: Serialize>(
        &self,
        target: impl Into<String>,
        body: &T,
    ) -> Result<HttpResponse> {
        self.dispatch(ApiRequest::put(target).json(body)?).await
    }

    pub async fn delete(&self, target: impl Into<String>) -> Result<HttpResponse> {
        self.dispatch(ApiRequest::delete(target)).await
    }

    fn signals_expiry(&self, response: &HttpResponse) -> bool {
        response.status == 401
            && response
                .header(self.config.expiry_header())
                .map(|value| value.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
    }

    async fn send(
        &self,
        request: &ApiRequest,
        url: &str,
        token: Option<&AccessToken>,
    ) -> Result<HttpResponse> {
        let mut outbound = HttpRequest::new(request.method, url);
        for (key, value) in &request.headers {
            outbound = outbound.header(key.clone(), value.clone());
        }
        if let Some(token) = token {
            outbound = outbound.bearer_token(token.as_str());
        }
        if let Some(body) = &request.body {
            outbound = outbound.body(body.clone());
        }
        Ok(self.http.execute(outbound).await?)
    }
}
