//! # API Endpoint Configuration
//!
//! Builder-validated configuration for the remote API the client talks to:
//! the base URL, the fixed auth endpoints, the expiry marker header, and the
//! public allow-list — the endpoints that never carry the access credential.
//!
//! The builder fails fast: an unparseable base URL or a path that does not
//! start with `/` is rejected at build time, not at dispatch time.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::ApiConfig;
//!
//! let config = ApiConfig::builder()
//!     .base_url("https://app.example.com")
//!     .build()
//!     .expect("valid config");
//!
//! assert!(config.is_public("/api/auth/refresh"));
//! assert!(!config.is_public("/api/posts"));
//! ```

use crate::error::{Error, Result};
use url::Url;

/// Default fixed path of the session-refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh";
/// Default fixed path of the logout endpoint.
pub const DEFAULT_LOGOUT_PATH: &str = "/api/auth/logout";
/// Default fixed path of the anti-forgery token endpoint.
pub const DEFAULT_CSRF_PATH: &str = "/api/csrf";
/// Default name of the response header marking an expired credential.
pub const DEFAULT_EXPIRY_HEADER: &str = "x-token-expired";

/// Resolved API configuration.
///
/// Construct through [`ApiConfig::builder`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: Url,
    refresh_path: String,
    logout_path: String,
    csrf_path: String,
    expiry_header: String,
    public_paths: Vec<String>,
}

impl ApiConfig {
    pub fn builder() -> ApiConfigBuilder {
        ApiConfigBuilder::default()
    }

    /// Absolute URL of the session-refresh endpoint.
    pub fn refresh_url(&self) -> String {
        self.resolve(&self.refresh_path)
    }

    /// Absolute URL of the logout endpoint.
    pub fn logout_url(&self) -> String {
        self.resolve(&self.logout_path)
    }

    /// Absolute URL of the anti-forgery token endpoint.
    pub fn csrf_url(&self) -> String {
        self.resolve(&self.csrf_path)
    }

    /// Path of the logout endpoint, for dispatching through the client.
    pub fn logout_path(&self) -> &str {
        &self.logout_path
    }

    /// Name of the response header that marks a `401` as credential expiry.
    /// Compared case-insensitively against response headers.
    pub fn expiry_header(&self) -> &str {
        &self.expiry_header
    }

    /// Resolve a request target against the base URL. Targets that are
    /// already absolute pass through untouched.
    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{}{}", base, target)
    }

    /// Whether the target is a public (unauthenticated) endpoint.
    ///
    /// Matched by substring, the way the allow-list is applied in the
    /// original client: a target mentioning a public path anywhere counts
    /// as public and never carries the stored credential.
    pub fn is_public(&self, target: &str) -> bool {
        self.public_paths.iter().any(|path| target.contains(path))
    }
}

/// Builder for [`ApiConfig`] with fail-fast validation.
#[derive(Debug, Default)]
pub struct ApiConfigBuilder {
    base_url: Option<String>,
    refresh_path: Option<String>,
    logout_path: Option<String>,
    csrf_path: Option<String>,
    expiry_header: Option<String>,
    extra_public_paths: Vec<String>,
}

impl ApiConfigBuilder {
    /// Base URL of the remote API (required).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    pub fn logout_path(mut self, path: impl Into<String>) -> Self {
        self.logout_path = Some(path.into());
        self
    }

    pub fn csrf_path(mut self, path: impl Into<String>) -> Self {
        self.csrf_path = Some(path.into());
        self
    }

    /// Override the expiry marker header name.
    pub fn expiry_header(mut self, name: impl Into<String>) -> Self {
        self.expiry_header = Some(name.into());
        self
    }

    /// Add a public (unauthenticated) path beyond the fixed allow-list.
    pub fn public_path(mut self, path: impl Into<String>) -> Self {
        self.extra_public_paths.push(path.into());
        self
    }

    pub fn build(self) -> Result<ApiConfig> {
        let base = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;
        let base_url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("invalid base_url '{}': {}", base, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base_url must be http(s), got '{}'",
                base_url.scheme()
            )));
        }

        let refresh_path = self
            .refresh_path
            .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string());
        let logout_path = self
            .logout_path
            .unwrap_or_else(|| DEFAULT_LOGOUT_PATH.to_string());
        let csrf_path = self
            .csrf_path
            .unwrap_or_else(|| DEFAULT_CSRF_PATH.to_string());

        for path in [&refresh_path, &logout_path, &csrf_path]
            .into_iter()
            .chain(self.extra_public_paths.iter())
        {
            if !path.starts_with('/') {
                return Err(Error::Config(format!(
                    "endpoint path '{}' must start with '/'",
                    path
                )));
            }
        }

        // The refresh and anti-forgery endpoints form the fixed public
        // allow-list; logout is protected (it goes through the dispatcher).
        let mut public_paths = vec![refresh_path.clone(), csrf_path.clone()];
        public_paths.extend(self.extra_public_paths);

        Ok(ApiConfig {
            base_url,
            refresh_path,
            logout_path,
            csrf_path,
            expiry_header: self
                .expiry_header
                .unwrap_or_else(|| DEFAULT_EXPIRY_HEADER.to_string()),
            public_paths,
        })
    }
}
