//! The access gate: the single decision point every UI surface calls before
//! rendering a control or allowing a mutation.
//!
//! Resolution order: unauthenticated short-circuit → local fast-reject
//! against the live capability set → cache → shared in-flight oracle
//! request. Scope tokens (`own`/`supervised`/`all`) are effectively resolved
//! only here, by deferring entirely to the oracle's per-resource decision;
//! the client never determines "is this resource mine" itself.
//!
//! Concurrency: N concurrent checks for one key share a single oracle call
//! (flights are keyed identically to the cache). Flights are driven by a
//! spawned task, so a caller dropping its future cannot wedge the other
//! joiners. On identity change the registered hook clears the cache and the
//! flight map in that order; a flight that started earlier resolves its
//! joiners but its result is discarded by the cache-generation check.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use peopleops_auth::{IdentityStore, Principal};
use peopleops_core::{PageId, ResourceId};

use crate::cache::{CacheKey, DecisionCache};
use crate::decision::{Decision, Verb};
use crate::oracle::DecisionOracle;
use crate::pages::PageRegistry;

/// Render-state of a checked surface.
///
/// `Denied` (policy says no) and `Unreachable` (the check failed) are both
/// terminal "do not show" states, distinguished only for diagnostics.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    Resolving,
    Granted,
    Denied,
    Unreachable,
}

/// What a caller renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateVerdict {
    pub granted: bool,
    pub state: GateState,
    pub decision: Option<Decision>,
}

impl GateVerdict {
    fn unauthenticated() -> Self {
        Self {
            granted: false,
            state: GateState::Unauthenticated,
            decision: None,
        }
    }

    fn resolving() -> Self {
        Self {
            granted: false,
            state: GateState::Resolving,
            decision: None,
        }
    }

    fn from_decision(decision: Decision, verb: Verb) -> Self {
        let (granted, state) = if decision.unreachable {
            (false, GateState::Unreachable)
        } else if decision.verdict(verb) {
            (true, GateState::Granted)
        } else {
            (false, GateState::Denied)
        };
        Self {
            granted,
            state,
            decision: Some(decision),
        }
    }

    /// Denial explanation (with the missing required-capability list) for
    /// whole-page "Access Denied" surfaces; `None` when granted or still
    /// unresolved.
    pub fn explanation(&self) -> Option<String> {
        match self.state {
            GateState::Denied | GateState::Unreachable => {
                self.decision.as_ref().map(|d| d.explanation())
            }
            _ => None,
        }
    }
}

type FlightMap = HashMap<CacheKey, watch::Receiver<Option<Decision>>>;

/// The consumption API for access decisions.
///
/// Cheap to clone; all clones share cache, flights and identity.
#[derive(Clone)]
pub struct AccessGate {
    identity: IdentityStore,
    registry: Arc<PageRegistry>,
    cache: DecisionCache,
    oracle: Arc<dyn DecisionOracle>,
    flights: Arc<Mutex<FlightMap>>,
}

impl AccessGate {
    /// Wire the gate and register its invalidation hook: any identity
    /// change (login, logout, refresh with changed capabilities) clears the
    /// cache and the in-flight map before the mutating call returns.
    pub fn new(
        identity: IdentityStore,
        registry: Arc<PageRegistry>,
        cache: DecisionCache,
        oracle: Arc<dyn DecisionOracle>,
    ) -> Self {
        let flights: Arc<Mutex<FlightMap>> = Arc::new(Mutex::new(HashMap::new()));

        {
            let cache = cache.clone();
            let flights = flights.clone();
            identity.subscribe(move |change| {
                tracing::debug!(?change, "identity changed; invalidating decisions");
                cache.invalidate_all();
                let mut flights = flights.lock().unwrap_or_else(|e| e.into_inner());
                flights.clear();
            });
        }

        Self {
            identity,
            registry,
            cache,
            oracle,
            flights,
        }
    }

    /// Resolve whether `verb` may be exercised on `page` (optionally for a
    /// specific resource). Never grants optimistically and never errors:
    /// every failure mode resolves to a fail-closed verdict.
    pub async fn check(
        &self,
        page: &PageId,
        resource: Option<ResourceId>,
        verb: Verb,
    ) -> GateVerdict {
        let Some(principal) = self.identity.principal() else {
            return GateVerdict::unauthenticated();
        };

        let descriptor = match self.registry.get(page) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                // Programmer error: loud, then fail closed.
                tracing::error!("access check against unregistered page: {err}");
                return GateVerdict::from_decision(
                    Decision::denied(format!("page '{page}' is not registered")),
                    verb,
                );
            }
        };

        if descriptor.resource_scoped && resource.is_none() {
            tracing::warn!(page = %page, "resource-scoped page checked without a resource id");
        }

        // Local fast-reject: if the aggregate set cannot satisfy the page
        // predicate even with scope widening, the oracle cannot grant it.
        if !descriptor.predicate.eval(&principal.capabilities) {
            let required: Vec<String> = descriptor
                .predicate
                .tokens()
                .iter()
                .map(|t| t.to_string())
                .collect();
            return GateVerdict::from_decision(
                Decision::denied(format!("missing capability for page '{page}'"))
                    .with_required(required),
                verb,
            );
        }

        let key = CacheKey::new(page.clone(), resource, principal.principal_id);

        if let Some(decision) = self.cache.get(&key) {
            return GateVerdict::from_decision(decision, verb);
        }

        let decision = self.resolve(key).await;
        GateVerdict::from_decision(decision, verb)
    }

    /// Synchronous, cache-only probe for render paths that must not
    /// suspend. `None` means no cached decision and no flight in progress;
    /// the caller should `check`.
    pub fn check_cached(
        &self,
        page: &PageId,
        resource: Option<ResourceId>,
        verb: Verb,
    ) -> Option<GateVerdict> {
        let principal = match self.identity.principal() {
            Some(principal) => principal,
            None => return Some(GateVerdict::unauthenticated()),
        };

        let key = CacheKey::new(page.clone(), resource, principal.principal_id);

        if let Some(decision) = self.cache.get(&key) {
            return Some(GateVerdict::from_decision(decision, verb));
        }

        let flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        if flights.contains_key(&key) {
            return Some(GateVerdict::resolving());
        }
        None
    }

    /// Join or start the single in-flight oracle request for `key`.
    async fn resolve(&self, key: CacheKey) -> Decision {
        let mut rx = {
            let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(rx) = flights.get(&key) {
                rx.clone()
            } else {
                let (tx, rx) = watch::channel(None);
                flights.insert(key.clone(), rx.clone());

                let oracle = self.oracle.clone();
                let cache = self.cache.clone();
                let flight_map = self.flights.clone();
                let flight_key = key.clone();
                let flight_rx = rx.clone();
                // Snapshot now: an invalidation between here and flight
                // completion makes the generation check discard the result.
                let generation = cache.generation();

                tokio::spawn(async move {
                    let decision = oracle.decide(&flight_key.page, flight_key.resource).await;

                    // Fail-closed placeholders are not memoized; the caller
                    // may explicitly re-trigger once the oracle is back.
                    if !decision.unreachable {
                        cache.put_if_generation(flight_key.clone(), decision.clone(), generation);
                    }

                    // Deregister before waking joiners so a new caller
                    // starts a fresh flight instead of joining a finished
                    // one. Only remove our own entry: the map may already
                    // hold a successor flight after an invalidation.
                    {
                        let mut flights =
                            flight_map.lock().unwrap_or_else(|e| e.into_inner());
                        if flights
                            .get(&flight_key)
                            .is_some_and(|current| current.same_channel(&flight_rx))
                        {
                            flights.remove(&flight_key);
                        }
                    }

                    let _ = tx.send(Some(decision));
                });

                rx
            }
        };

        match rx.wait_for(|decision| decision.is_some()).await {
            Ok(guard) => guard
                .clone()
                .unwrap_or_else(|| Decision::unreachable("decision resolved without a value")),
            Err(_) => Decision::unreachable("decision request was abandoned"),
        }
    }

    /// Snapshot accessor, mainly for diagnostics surfaces.
    pub fn principal(&self) -> Option<Principal> {
        self.identity.principal()
    }
}
