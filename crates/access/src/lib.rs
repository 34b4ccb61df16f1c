//! `peopleops-access` — capability resolution and access decisions.
//!
//! The consumption protocol every UI surface follows: ask the
//! [`AccessGate`] before rendering a control or allowing a mutation, build
//! menus from the [`NavigationFilter`], and treat every uncertain outcome
//! as a denial. Decisions come from the backend oracle and are memoized in
//! the [`DecisionCache`] until TTL expiry or an identity change.

pub mod cache;
pub mod clock;
pub mod decision;
pub mod gate;
pub mod navigation;
pub mod oracle;
pub mod pages;

pub use cache::{CacheKey, DecisionCache, default_ttl};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{Decision, DecisionRequest, DecisionResponse, PermissionsPayload, Verb};
pub use gate::{AccessGate, GateState, GateVerdict};
pub use navigation::NavigationFilter;
pub use oracle::{DecisionOracle, HttpDecisionOracle};
pub use pages::{CapabilityPredicate, PageDescriptor, PageRegistry, default_registry};
