//! Black-box tests of the access gate against a scripted oracle and a
//! simulated clock: fail-closed behavior, caching, de-duplication, and the
//! logout-mid-flight sequence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use peopleops_access::{
    AccessGate, Decision, DecisionCache, DecisionOracle, GateState, ManualClock, NavigationFilter,
    Verb, default_registry,
};
use peopleops_auth::{
    AuthError, Credentials, IdentityApi, IdentityPayload, IdentityStore, LoginResponse,
};
use peopleops_core::{PageId, PrincipalId, ResourceId};

// ─────────────────────────────────────────────────────────────────────────────
// Test doubles
// ─────────────────────────────────────────────────────────────────────────────

/// Identity API that always accepts the configured identity. The payload
/// can be swapped to simulate out-of-band role grants.
struct StaticIdentityApi {
    payload: Mutex<IdentityPayload>,
}

impl StaticIdentityApi {
    fn set_capabilities(&self, capabilities: &[&str]) {
        let mut payload = self.payload.lock().unwrap();
        payload.capabilities = capabilities.iter().map(|s| s.to_string()).collect();
    }
}

#[async_trait]
impl IdentityApi for StaticIdentityApi {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        Ok(LoginResponse {
            token: "tok".to_string(),
            identity: self.payload.lock().unwrap().clone(),
        })
    }

    async fn fetch_identity(&self) -> Result<IdentityPayload, AuthError> {
        Ok(self.payload.lock().unwrap().clone())
    }

    async fn logout(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Oracle with per-(page, resource) scripted decisions, a call counter and
/// an optional artificial latency.
struct ScriptedOracle {
    decisions: Mutex<HashMap<(PageId, Option<ResourceId>), Decision>>,
    fallback: Decision,
    delay: Option<StdDuration>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn new(fallback: Decision) -> Self {
        Self {
            decisions: Mutex::new(HashMap::new()),
            fallback,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn script(&self, page: &str, resource: Option<i64>, decision: Decision) {
        self.decisions.lock().unwrap().insert(
            (PageId::from(page.to_string()), resource.map(ResourceId::new)),
            decision,
        );
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, page: &PageId, resource: Option<ResourceId>) -> Decision {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let decisions = self.decisions.lock().unwrap();
        decisions
            .get(&(page.clone(), resource))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

fn edit_decision(can_edit: bool) -> Decision {
    Decision {
        can_view: true,
        can_edit,
        can_create: false,
        can_delete: false,
        message: if can_edit {
            String::new()
        } else {
            "you may only edit your own record".to_string()
        },
        user_role: Some("employee".to_string()),
        required_capabilities: if can_edit {
            Vec::new()
        } else {
            vec!["employee.edit.all".to_string()]
        },
        unreachable: false,
    }
}

struct Harness {
    identity: IdentityStore,
    gate: AccessGate,
    cache: DecisionCache,
    clock: Arc<ManualClock>,
    oracle: Arc<ScriptedOracle>,
    api: Arc<StaticIdentityApi>,
}

async fn harness(capabilities: &[&str], oracle: ScriptedOracle) -> Harness {
    let payload = IdentityPayload {
        principal_id: PrincipalId::new(),
        employee_id: Some(7),
        roles: vec!["employee".to_string()],
        capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
    };
    let api = Arc::new(StaticIdentityApi {
        payload: Mutex::new(payload),
    });
    let identity = IdentityStore::new(api.clone());

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = DecisionCache::new(clock.clone());
    let oracle = Arc::new(oracle);
    let gate = AccessGate::new(
        identity.clone(),
        Arc::new(default_registry()),
        cache.clone(),
        oracle.clone(),
    );

    identity
        .login(&Credentials {
            email: "pat@example.com".to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .expect("scripted login cannot fail");

    Harness {
        identity,
        gate,
        cache,
        clock,
        oracle,
        api,
    }
}

fn edit_page() -> PageId {
    PageId::from("employees/edit")
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fail_closed_when_oracle_unreachable() {
    let h = harness(
        &["employee.read.own", "employee.edit.own"],
        ScriptedOracle::new(Decision::unreachable("oracle down")),
    )
    .await;

    for verb in [Verb::View, Verb::Edit, Verb::Create, Verb::Delete] {
        let verdict = h
            .gate
            .check(&edit_page(), Some(ResourceId::new(7)), verb)
            .await;
        assert!(!verdict.granted, "{verb} must fail closed");
        assert_eq!(verdict.state, GateState::Unreachable);
        assert!(verdict.explanation().is_some());
    }

    // Fail-closed placeholders are never memoized: each check re-asked.
    assert_eq!(h.oracle.calls(), 4);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn scenario_a_non_owned_resource_is_denied() {
    let oracle = ScriptedOracle::new(Decision::denied("unknown request"));
    oracle.script("employees/edit", Some(42), edit_decision(false));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    let verdict = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(42)), Verb::Edit)
        .await;

    assert!(!verdict.granted);
    assert_eq!(verdict.state, GateState::Denied);
    assert_eq!(
        verdict.explanation().unwrap(),
        "you may only edit your own record (required: employee.edit.all)"
    );
    assert_eq!(h.oracle.calls(), 1);
}

#[tokio::test]
async fn scenario_b_owned_resource_granted_then_cached() {
    let oracle = ScriptedOracle::new(Decision::denied("unknown request"));
    oracle.script("employees/edit", Some(7), edit_decision(true));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    let first = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert!(first.granted);
    assert_eq!(first.state, GateState::Granted);

    // Identical call within TTL: served from cache, no second oracle call.
    let second = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert!(second.granted);
    assert_eq!(h.oracle.calls(), 1);

    // The independent view verdict comes from the same cached decision.
    let view = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::View)
        .await;
    assert!(view.granted);
    assert_eq!(h.oracle.calls(), 1);
}

#[tokio::test]
async fn scenario_c_logout_mid_flight() {
    let oracle = ScriptedOracle::new(edit_decision(true)).with_delay(StdDuration::from_millis(50));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    let gate = h.gate.clone();
    let pending = tokio::spawn(async move {
        gate.check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
            .await
    });

    // Let the flight start, then log out underneath it.
    tokio::time::sleep(StdDuration::from_millis(10)).await;
    h.identity.logout().await;

    assert!(!h.identity.has_capability(&"employee.read.own".parse().unwrap()));
    assert!(!h.identity.has_capability(&"employee.edit.own".parse().unwrap()));

    // The pending check resolves without crashing; its result must not
    // survive the invalidation.
    let _ = pending.await.expect("in-flight check must not panic");
    assert!(h.cache.is_empty());

    // Any new check short-circuits to denied without a network call.
    let calls_before = h.oracle.calls();
    let verdict = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert!(!verdict.granted);
    assert_eq!(verdict.state, GateState::Unauthenticated);
    assert_eq!(h.oracle.calls(), calls_before);
}

#[tokio::test]
async fn concurrent_checks_share_one_oracle_call() {
    let oracle = ScriptedOracle::new(Decision::denied("unknown request"))
        .with_delay(StdDuration::from_millis(50));
    oracle.script("employees/edit", Some(7), edit_decision(true));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let gate = h.gate.clone();
        tasks.push(tokio::spawn(async move {
            gate.check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
                .await
        }));
    }

    let mut verdicts = Vec::new();
    for task in tasks {
        verdicts.push(task.await.unwrap());
    }

    assert_eq!(h.oracle.calls(), 1, "eight concurrent callers, one request");
    assert!(verdicts.iter().all(|v| v.granted));
    let first = &verdicts[0];
    assert!(verdicts.iter().all(|v| v == first));
}

#[tokio::test]
async fn ttl_expiry_triggers_exactly_one_fresh_call() {
    let oracle = ScriptedOracle::new(Decision::denied("unknown request"));
    oracle.script("employees/edit", Some(7), edit_decision(true));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    h.gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert_eq!(h.oracle.calls(), 1);

    h.clock.advance(Duration::minutes(6));

    let verdict = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert!(verdict.granted);
    assert_eq!(h.oracle.calls(), 2, "stale entry causes exactly one refetch");

    h.gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert_eq!(h.oracle.calls(), 2, "fresh entry is served from cache again");
}

#[tokio::test]
async fn refresh_without_capability_change_keeps_cache() {
    let oracle = ScriptedOracle::new(Decision::denied("unknown request"));
    oracle.script("employees/edit", Some(7), edit_decision(true));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    h.gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert_eq!(h.cache.len(), 1);

    // Identity unchanged on refresh: no invalidation.
    h.identity.refresh().await;
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test]
async fn refresh_with_changed_capabilities_invalidates_cache() {
    let oracle = ScriptedOracle::new(Decision::denied("unknown request"));
    oracle.script("employees/edit", Some(7), edit_decision(true));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    h.gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert_eq!(h.oracle.calls(), 1);
    assert_eq!(h.cache.len(), 1);

    // An out-of-band role change lands via refresh; every cached decision
    // predates it and must go.
    h.api
        .set_capabilities(&["employee.read.own", "employee.edit.own", "payroll.read.own"]);
    h.identity.refresh().await;
    assert!(h.cache.is_empty());

    let verdict = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert!(verdict.granted);
    assert_eq!(h.oracle.calls(), 2, "post-refresh check re-consults the oracle");
}

#[tokio::test]
async fn check_issued_after_invalidation_starts_a_fresh_flight() {
    let oracle = ScriptedOracle::new(Decision::denied("unknown request"))
        .with_delay(StdDuration::from_millis(80));
    oracle.script("employees/edit", Some(7), edit_decision(true));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    // Start a flight, then change the capability set underneath it via a
    // refresh while it is still mid-air.
    let gate = h.gate.clone();
    let pending = tokio::spawn(async move {
        gate.check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
            .await
    });
    tokio::time::sleep(StdDuration::from_millis(10)).await;

    h.api
        .set_capabilities(&["employee.read.own", "employee.edit.own", "payroll.read.own"]);
    h.identity.refresh().await;
    assert_eq!(h.oracle.calls(), 1);

    // A check issued after the invalidation must not join or reuse the
    // pre-invalidation flight: exactly one more oracle call.
    let verdict = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;
    assert!(verdict.granted);
    assert_eq!(h.oracle.calls(), 2, "post-invalidation check starts its own flight");

    // The stale flight still resolves its joiner without crashing, and only
    // the fresh flight's result is cached.
    let stale = pending.await.expect("pre-invalidation check must not panic");
    assert!(stale.decision.is_some());
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test]
async fn local_fast_reject_never_calls_the_oracle() {
    let oracle = ScriptedOracle::new(edit_decision(true));
    let h = harness(&["employee.read.own"], oracle).await;

    // No employee.edit.* capability at all: the oracle could not grant
    // this either, so the gate denies locally.
    let verdict = h
        .gate
        .check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .await;

    assert!(!verdict.granted);
    assert_eq!(verdict.state, GateState::Denied);
    assert_eq!(h.oracle.calls(), 0);
    let explanation = verdict.explanation().unwrap();
    assert!(
        explanation.contains("employee.edit"),
        "denial lists the missing capability: {explanation}"
    );
}

#[tokio::test]
async fn unregistered_page_fails_closed_without_network() {
    let oracle = ScriptedOracle::new(edit_decision(true));
    let h = harness(&["employee.read.own"], oracle).await;

    let verdict = h
        .gate
        .check(&PageId::from("employees/terminate"), None, Verb::View)
        .await;

    assert!(!verdict.granted);
    assert_eq!(verdict.state, GateState::Denied);
    assert_eq!(h.oracle.calls(), 0);
}

#[tokio::test]
async fn unauthenticated_check_short_circuits() {
    let oracle = ScriptedOracle::new(edit_decision(true));
    let h = harness(&["employee.read.own"], oracle).await;
    h.identity.logout().await;

    let verdict = h.gate.check(&edit_page(), None, Verb::View).await;
    assert_eq!(verdict.state, GateState::Unauthenticated);
    assert!(!verdict.granted);
    assert_eq!(h.oracle.calls(), 0);
}

#[tokio::test]
async fn check_cached_probe_reports_resolving_then_verdict() {
    let oracle = ScriptedOracle::new(Decision::denied("unknown request"))
        .with_delay(StdDuration::from_millis(50));
    oracle.script("employees/edit", Some(7), edit_decision(true));
    let h = harness(&["employee.read.own", "employee.edit.own"], oracle).await;

    // Nothing cached, nothing in flight.
    assert!(h
        .gate
        .check_cached(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .is_none());

    let gate = h.gate.clone();
    let pending = tokio::spawn(async move {
        gate.check(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
            .await
    });
    tokio::time::sleep(StdDuration::from_millis(10)).await;

    let probe = h
        .gate
        .check_cached(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .expect("a flight is pending");
    assert_eq!(probe.state, GateState::Resolving);
    assert!(!probe.granted, "never optimistic while resolving");

    pending.await.unwrap();

    let probe = h
        .gate
        .check_cached(&edit_page(), Some(ResourceId::new(7)), Verb::Edit)
        .expect("decision is cached now");
    assert_eq!(probe.state, GateState::Granted);
    assert!(probe.granted);
}

// ─────────────────────────────────────────────────────────────────────────────
// Navigation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn navigation_reflects_capability_set() {
    let h = harness(
        &["employee.read.own", "leave.create.own", "dashboard.read"],
        ScriptedOracle::new(Decision::denied("unused")),
    )
    .await;

    let registry = Arc::new(default_registry());
    let nav = NavigationFilter::new(registry, h.identity.clone());

    let ids: Vec<&str> = nav
        .accessible_pages()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "dashboard",
            "employees/list",
            "employees/detail",
            "leave/requests",
            "profile",
        ]
    );

    // Highest-priority reachable page wins as home.
    assert_eq!(nav.home().unwrap().id.as_str(), "dashboard");
}

#[tokio::test]
async fn navigation_falls_back_to_profile_home() {
    let h = harness(&[], ScriptedOracle::new(Decision::denied("unused"))).await;
    let nav = NavigationFilter::new(Arc::new(default_registry()), h.identity.clone());

    let ids: Vec<&str> = nav
        .accessible_pages()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(ids, vec!["profile"]);
    assert_eq!(nav.home().unwrap().id.as_str(), "profile");
}

#[tokio::test]
async fn navigation_is_empty_after_logout() {
    let h = harness(
        &["employee.read.own"],
        ScriptedOracle::new(Decision::denied("unused")),
    )
    .await;
    let nav = NavigationFilter::new(Arc::new(default_registry()), h.identity.clone());
    assert!(!nav.accessible_pages().is_empty());

    h.identity.logout().await;

    assert!(nav.accessible_pages().is_empty());
    assert!(nav.home().is_none());
}
