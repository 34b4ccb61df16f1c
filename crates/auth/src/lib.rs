//! `peopleops-auth` — session identity and the capability model.
//!
//! This crate owns "who is logged in and what can they do, in aggregate":
//! the capability-token grammar, the closed role set, the live `Principal`,
//! and the `IdentityStore` lifecycle (login/logout/refresh) with its change
//! hooks. It is intentionally decoupled from page registration and decision
//! caching; those consume this crate through membership checks and hooks.

pub mod api;
pub mod capability;
pub mod error;
pub mod identity;
pub mod principal;
pub mod roles;
pub mod session;

pub use api::{Credentials, HttpIdentityApi, IdentityApi, IdentityPayload, LoginResponse};
pub use capability::{CapabilityParseError, CapabilitySet, CapabilityToken, Scope};
pub use error::AuthError;
pub use identity::{IdentityChange, IdentityStore, RefreshOutcome};
pub use principal::Principal;
pub use roles::{Role, UnknownRoleError};
pub use session::SessionToken;
