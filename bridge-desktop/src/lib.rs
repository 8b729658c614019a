//! # Desktop Bridge Implementations
//!
//! Desktop-ready implementations of the `bridge-traits` abstractions:
//!
//! - [`ReqwestHttpClient`] — reqwest-backed transport with a cookie jar for
//!   ambient session credentials and bounded retry on transient failures.
//! - [`FileTokenStorage`] — single-file credential slot watched with
//!   `notify` (plus a polling fallback), the inter-process analog of the
//!   browser storage event.
//! - [`MemoryTokenStorage`] — same contract, purely in-process. Used by
//!   tests and embedders that keep the credential off disk.

pub mod http;
pub mod storage;

pub use http::ReqwestHttpClient;
pub use storage::{FileTokenStorage, MemoryTokenStorage};
