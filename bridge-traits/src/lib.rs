//! # Bridge Traits
//!
//! Platform abstraction traits for the web client core.
//!
//! The core never talks to the network or the filesystem directly. Hosts
//! provide implementations of these traits (see `bridge-desktop` for the
//! desktop set), which keeps the auth core deterministic and testable with
//! in-process fakes.

pub mod error;
pub mod http;
pub mod storage;

pub use error::{BridgeError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::TokenStorage;
