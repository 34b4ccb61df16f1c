//! Wires the HTTP identity and oracle clients to the gate and prints what
//! the session can see: accessible navigation, the home page, and a sample
//! decision check.

use std::sync::Arc;

use anyhow::Context;

use peopleops_access::{
    AccessGate, DecisionCache, HttpDecisionOracle, NavigationFilter, SystemClock, Verb,
    default_registry,
};
use peopleops_auth::{Credentials, HttpIdentityApi, IdentityStore, SessionToken};
use peopleops_core::PageId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    peopleops_observability::init();

    let api_url = std::env::var("PEOPLEOPS_API_URL").unwrap_or_else(|_| {
        tracing::warn!("PEOPLEOPS_API_URL not set; using local dev default");
        "http://localhost:8080/api".to_string()
    });
    let email = std::env::var("PEOPLEOPS_EMAIL").context("PEOPLEOPS_EMAIL must be set")?;
    let password = std::env::var("PEOPLEOPS_PASSWORD").context("PEOPLEOPS_PASSWORD must be set")?;

    let session = SessionToken::new();
    let identity = IdentityStore::new(Arc::new(HttpIdentityApi::new(
        api_url.clone(),
        session.clone(),
    )));

    let registry = Arc::new(default_registry());
    let cache = DecisionCache::new(Arc::new(SystemClock));
    let oracle = Arc::new(HttpDecisionOracle::new(api_url, session));
    let gate = AccessGate::new(identity.clone(), registry.clone(), cache, oracle);

    let principal = identity
        .login(&Credentials { email, password })
        .await
        .context("login failed")?;
    tracing::info!(
        principal_id = %principal.principal_id,
        roles = ?principal.roles,
        capabilities = principal.capabilities.len(),
        "logged in"
    );

    let nav = NavigationFilter::new(registry, identity.clone());
    println!("Navigation:");
    for page in nav.accessible_pages() {
        println!("  [{}] {} ({})", page.icon, page.label, page.id);
    }
    match nav.home() {
        Some(home) => println!("Home: {}", home.id),
        None => println!("Home: none reachable"),
    }

    let dashboard = PageId::from("dashboard");
    let verdict = gate.check(&dashboard, None, Verb::View).await;
    match verdict.explanation() {
        None => println!("dashboard view: granted={}", verdict.granted),
        Some(reason) => println!("dashboard view: denied ({reason})"),
    }

    identity.logout().await;
    Ok(())
}
