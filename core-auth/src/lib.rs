//! # Authentication Module
//!
//! Client-side credential management for the web application core.
//!
//! ## Overview
//!
//! This crate owns the access credential and everything that touches it:
//!
//! - [`CredentialStore`] — single source of truth for the credential within
//!   a context, mirrored to durable storage and synchronized with other
//!   contexts through storage change notifications.
//! - [`RefreshCoordinator`] — guarantees at most one in-flight refresh call;
//!   every concurrent caller observes the same outcome.
//! - [`AuthorizedClient`] — attaches the credential to protected requests,
//!   detects the expiry signal, and transparently refreshes and retries
//!   once.
//! - [`CsrfGate`] — primes the anti-forgery token before protected calls.
//! - [`IdentityCache`] — caches the current-user record; invalidated on
//!   logout.
//! - [`SessionManager`] — sign-in/sign-out lifecycle; client-side logout is
//!   authoritative.

pub mod client;
pub mod csrf;
pub mod error;
pub mod identity;
pub mod refresh;
pub mod session;
pub mod store;
pub mod types;

pub use client::{ApiRequest, AuthorizedClient};
pub use csrf::CsrfGate;
pub use error::{AuthError, Result};
pub use identity::IdentityCache;
pub use refresh::RefreshCoordinator;
pub use session::SessionManager;
pub use store::CredentialStore;
pub use types::{AccessToken, UserIdentity};
