//! Typed transport adapter for the decision oracle.
//!
//! The oracle is the authoritative backend that resolves a page/resource
//! access request into a four-way verdict. This client performs no policy
//! logic; it translates requests to wire calls and maps every failure mode
//! (non-success status, network error, timeout, malformed body) to a
//! fail-closed [`Decision::unreachable`] — errors never propagate past the
//! gate, so a page cannot crash because authorization was unreachable.

use std::time::Duration;

use async_trait::async_trait;

use peopleops_auth::SessionToken;
use peopleops_core::{PageId, ResourceId};

use crate::decision::{Decision, DecisionRequest, DecisionResponse};

/// The seam the gate consumes; tests substitute scripted oracles.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, page: &PageId, resource: Option<ResourceId>) -> Decision;
}

/// Bounded request timeout; on expiry the call resolves to the fail-closed
/// path rather than hanging the caller.
const ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-over-HTTPS implementation of [`DecisionOracle`].
pub struct HttpDecisionOracle {
    base_url: String,
    client: reqwest::Client,
    session: SessionToken,
}

impl HttpDecisionOracle {
    /// `base_url` without a trailing slash; the session handle is shared
    /// with the identity client so the same credential rides every request.
    pub fn new(base_url: impl Into<String>, session: SessionToken) -> Self {
        let client = reqwest::Client::builder()
            .timeout(ORACLE_TIMEOUT)
            .build()
            .expect("oracle HTTP client with a static timeout must build");
        Self {
            base_url: base_url.into(),
            client,
            session,
        }
    }
}

#[async_trait]
impl DecisionOracle for HttpDecisionOracle {
    async fn decide(&self, page: &PageId, resource: Option<ResourceId>) -> Decision {
        let body = DecisionRequest::new(page.clone(), resource);
        let url = format!("{}/access/decision", self.base_url);

        let mut req = self.client.post(&url).json(&body);
        if let Some(token) = self.session.get() {
            req = req.bearer_auth(token);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(page = %page, "decision request failed: {err}");
                return Decision::unreachable(format!("authorization check failed: {err}"));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(page = %page, %status, "decision request rejected");
            return Decision::unreachable(format!(
                "authorization check failed with status {status}"
            ));
        }

        match resp.json::<DecisionResponse>().await {
            Ok(parsed) => Decision::from(parsed),
            Err(err) => {
                tracing::warn!(page = %page, "malformed decision response: {err}");
                Decision::unreachable(format!("malformed authorization response: {err}"))
            }
        }
    }
}
