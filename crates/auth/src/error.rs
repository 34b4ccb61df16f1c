//! Authentication error taxonomy.
//!
//! Only authentication errors are expected to propagate to caller-visible
//! error states (a login form). Transient oracle failures are resolved to
//! fail-closed decisions elsewhere and never reach this type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Login rejected by the backend; the message is surfaced to the user
    /// verbatim.
    #[error("{0}")]
    InvalidCredentials(String),

    /// Network failure reaching the identity endpoints.
    #[error("identity service unreachable: {0}")]
    Network(String),

    /// The identity endpoint answered with a body this client cannot use.
    #[error("malformed identity response: {0}")]
    MalformedResponse(String),

    /// The session credential is no longer accepted.
    #[error("session expired")]
    SessionExpired,
}
