//! Configuration error model.
//!
//! Configuration errors are programmer errors (bad static registration,
//! malformed identifiers in config), not runtime policy outcomes. Keep
//! transient/network failures out of this type; they belong to the caller's
//! error taxonomy.

use thiserror::Error;

/// A defect in static configuration or in an identifier supplied by it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A page identifier was requested that has no registered descriptor.
    #[error("no page registered under '{0}'")]
    UnknownPage(String),

    /// A page identifier was registered twice.
    #[error("page '{0}' registered more than once")]
    DuplicatePage(String),

    /// A capability token in configuration failed to parse.
    #[error("invalid capability token: {0}")]
    InvalidCapability(String),

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl ConfigurationError {
    pub fn unknown_page(page: impl Into<String>) -> Self {
        Self::UnknownPage(page.into())
    }

    pub fn duplicate_page(page: impl Into<String>) -> Self {
        Self::DuplicatePage(page.into())
    }

    pub fn invalid_capability(msg: impl Into<String>) -> Self {
        Self::InvalidCapability(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
