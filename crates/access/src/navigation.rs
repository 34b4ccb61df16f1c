//! Navigation derivation: which sections a principal may reach, and where
//! they land by default.
//!
//! These are local-only, non-resource-scoped checks over the aggregate
//! capability set — an optimistic hint for menu building, not an
//! authorization guarantee; the destination page re-validates through the
//! gate. Consumers re-query on identity change notifications; an empty
//! accessible set is a valid terminal state, not an error.

use std::sync::Arc;

use peopleops_auth::IdentityStore;

use crate::pages::{PageDescriptor, PageRegistry};

pub struct NavigationFilter {
    registry: Arc<PageRegistry>,
    identity: IdentityStore,
}

impl NavigationFilter {
    pub fn new(registry: Arc<PageRegistry>, identity: IdentityStore) -> Self {
        Self { registry, identity }
    }

    /// Registered pages whose predicate the live capability set satisfies,
    /// in navigation order. Empty when no principal is live.
    pub fn accessible_pages(&self) -> Vec<&PageDescriptor> {
        let Some(principal) = self.identity.principal() else {
            return Vec::new();
        };

        let mut pages: Vec<&PageDescriptor> = self
            .registry
            .pages()
            .iter()
            .filter(|page| page.predicate.eval(&principal.capabilities))
            .collect();
        pages.sort_by_key(|page| page.nav_order);
        pages
    }

    /// The default landing page: the first reachable page in the fixed
    /// home-priority ordering. `None` when unauthenticated or when the
    /// registry has no reachable home candidate.
    pub fn home(&self) -> Option<&PageDescriptor> {
        let principal = self.identity.principal()?;

        let mut candidates: Vec<&PageDescriptor> = self
            .registry
            .pages()
            .iter()
            .filter(|page| page.home_priority.is_some())
            .collect();
        candidates.sort_by_key(|page| page.home_priority);

        candidates
            .into_iter()
            .find(|page| page.predicate.eval(&principal.capabilities))
    }
}
