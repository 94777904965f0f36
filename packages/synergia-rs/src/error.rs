//! Typed errors for the Synergia client.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure kind and decide which ones are user-correctable.

use thiserror::Error;

/// Classified login failures.
///
/// `InvalidCredentials` is the only user-correctable kind. The cookie and
/// protocol kinds signal upstream shape drift and are surfaced distinctly so
/// drift is observable instead of silently mis-parsed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The upstream grant step rejected the credential pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The login flow completed but no recognized session cookie was set.
    #[error("no session cookies after login")]
    NoSessionCookies,

    /// The login flow did not match any known continuation shape.
    #[error("login protocol changed: {reason}")]
    ProtocolChanged { reason: String },

    /// A login request exceeded the transport timeout.
    #[error("timeout during login")]
    Timeout,

    /// Connection-level failure during login.
    #[error("network error during login: {0}")]
    Network(String),

    /// Anything unclassified.
    #[error("unexpected login error: {0}")]
    Unknown(String),
}

/// Transport-level failures. Non-2xx statuses are not errors; they come
/// back to the caller as a normal [`Exchange`](crate::transport::Exchange).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => AuthError::Timeout,
            TransportError::Network(e) => AuthError::Network(e.to_string()),
            TransportError::InvalidRequest(reason) => AuthError::Unknown(reason),
        }
    }
}

/// Result type alias for login operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;
