//! The identity store: single source of truth for the live session.
//!
//! Lifecycle: populated on login, replaced on refresh, cleared on logout.
//! Change hooks run synchronously inside the mutating call (after the store
//! has been updated, before the call returns), so a cache-invalidation hook
//! is guaranteed to complete before any later membership check or decision
//! request can observe the new session state.

use std::sync::{Arc, RwLock};

use crate::api::{Credentials, IdentityApi};
use crate::capability::CapabilityToken;
use crate::error::AuthError;
use crate::principal::Principal;

/// What changed about the live session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdentityChange {
    LoggedIn,
    LoggedOut,
    /// A silent refresh observed a different role/capability state.
    Refreshed,
}

/// Outcome of a silent refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Identity re-fetched and it differs from the previous state.
    Refreshed(Principal),
    /// Identity unchanged, or the store is empty, or the fetch failed
    /// transiently (degraded to "no change" rather than a forced logout).
    Unchanged,
}

type ChangeHook = Box<dyn Fn(IdentityChange) + Send + Sync>;

/// Process-wide holder of the authenticated principal.
///
/// Cheap to clone; all clones share the same live session.
#[derive(Clone)]
pub struct IdentityStore {
    api: Arc<dyn IdentityApi>,
    inner: Arc<RwLock<Option<Principal>>>,
    hooks: Arc<RwLock<Vec<ChangeHook>>>,
}

impl IdentityStore {
    pub fn new(api: Arc<dyn IdentityApi>) -> Self {
        Self {
            api,
            inner: Arc::new(RwLock::new(None)),
            hooks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a synchronous change hook (cache invalidation, navigation
    /// recomputation). Hooks run inside the mutating call, in registration
    /// order, after the store has been updated.
    pub fn subscribe(&self, hook: impl Fn(IdentityChange) + Send + Sync + 'static) {
        let mut hooks = self.hooks.write().unwrap_or_else(|e| e.into_inner());
        hooks.push(Box::new(hook));
    }

    fn notify(&self, change: IdentityChange) {
        let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner());
        for hook in hooks.iter() {
            hook(change);
        }
    }

    /// Authenticate and populate the store.
    ///
    /// On failure the store is left empty — no partial state.
    pub async fn login(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let response = self.api.login(credentials).await?;
        let principal = Principal::from_payload(&response.identity)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        {
            let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
            *guard = Some(principal.clone());
        }
        tracing::info!(principal_id = %principal.principal_id, "session established");
        self.notify(IdentityChange::LoggedIn);
        Ok(principal)
    }

    /// Clear the session.
    ///
    /// Local state clears unconditionally and hooks fire before the remote
    /// logout call is attempted; a failed remote call is logged, never
    /// surfaced.
    pub async fn logout(&self) {
        let had_session = {
            let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
            guard.take().is_some()
        };
        if had_session {
            self.notify(IdentityChange::LoggedOut);
        }

        if let Err(err) = self.api.logout().await {
            tracing::warn!("remote logout failed (local session already cleared): {err}");
        }
    }

    /// Re-fetch identity after an out-of-band role grant/revoke.
    ///
    /// Hooks fire if and only if the role/capability state actually changed.
    /// A transient fetch failure degrades to `Unchanged` — no spurious
    /// session loss — but an explicit `SessionExpired` clears the store.
    pub async fn refresh(&self) -> RefreshOutcome {
        let current = match self.principal() {
            Some(p) => p,
            None => return RefreshOutcome::Unchanged,
        };

        let payload = match self.api.fetch_identity().await {
            Ok(payload) => payload,
            Err(AuthError::SessionExpired) => {
                tracing::info!("session expired during refresh; clearing");
                self.logout().await;
                return RefreshOutcome::Unchanged;
            }
            Err(err) => {
                tracing::warn!("identity refresh failed, keeping current state: {err}");
                return RefreshOutcome::Unchanged;
            }
        };

        let fresh = match Principal::from_payload(&payload) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!("identity refresh returned malformed payload, keeping current state: {err}");
                return RefreshOutcome::Unchanged;
            }
        };

        if fresh.roles == current.roles && fresh.capabilities == current.capabilities {
            return RefreshOutcome::Unchanged;
        }

        {
            let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
            *guard = Some(fresh.clone());
        }
        tracing::info!(principal_id = %fresh.principal_id, "capability set changed on refresh");
        self.notify(IdentityChange::Refreshed);
        RefreshOutcome::Refreshed(fresh)
    }

    /// Snapshot of the live principal, if any.
    pub fn principal(&self) -> Option<Principal> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.is_some()
    }

    /// Scope-widened membership check over the live capability set.
    /// False when no principal is live.
    pub fn has_capability(&self, token: &CapabilityToken) -> bool {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .is_some_and(|p| p.capabilities.satisfies(token))
    }

    pub fn has_any(&self, tokens: &[CapabilityToken]) -> bool {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .is_some_and(|p| p.capabilities.satisfies_any(tokens))
    }

    pub fn has_all(&self, tokens: &[CapabilityToken]) -> bool {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .is_some_and(|p| p.capabilities.satisfies_all(tokens))
    }
}
