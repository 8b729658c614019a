use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Network failure issuing a request. Never retried by this core; the
    /// transport's own retry policy has already run its course.
    #[error("Transport failure: {0}")]
    Transport(#[from] BridgeError),

    /// The shared refresh call settled without yielding a credential. The
    /// session has ended; callers must not retry the refresh themselves.
    #[error("Credential refresh failed; session ended")]
    RefreshFailed,

    /// The anti-forgery endpoint rejected the priming fetch.
    #[error("Anti-forgery token fetch failed with status {status}")]
    CsrfUnavailable { status: u16 },

    /// The request descriptor could not be built (body serialization).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
