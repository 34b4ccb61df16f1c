//! `peopleops-core` — shared foundation for the access layer.
//!
//! This crate contains **pure** primitives (identifiers and the configuration
//! error model); no networking or policy logic lives here.

pub mod error;
pub mod id;

pub use error::ConfigurationError;
pub use id::{PageId, PrincipalId, ResourceId};
