//! Typed transport adapter for the identity endpoints.
//!
//! The trait is the seam the [`IdentityStore`](crate::identity::IdentityStore)
//! consumes; the HTTP implementation talks JSON to the backend with the
//! session credential attached. No policy logic lives here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use peopleops_core::PrincipalId;

use crate::error::AuthError;
use crate::session::SessionToken;

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Identity payload returned on login and on refresh: the principal's role
/// list and aggregated capability-token list, as wire strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub principal_id: PrincipalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<i64>,
    pub roles: Vec<String>,
    pub capabilities: Vec<String>,
}

/// Successful login response: the opaque session credential plus identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub identity: IdentityPayload,
}

/// Identity endpoint contract.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Exchange credentials for a session and the initial identity payload.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError>;

    /// Re-fetch the identity payload for the current session.
    async fn fetch_identity(&self) -> Result<IdentityPayload, AuthError>;

    /// Invalidate the session server-side.
    async fn logout(&self) -> Result<(), AuthError>;
}

/// Request timeout for identity calls.
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-over-HTTPS implementation of [`IdentityApi`].
pub struct HttpIdentityApi {
    base_url: String,
    client: reqwest::Client,
    session: SessionToken,
}

impl HttpIdentityApi {
    /// `base_url` without a trailing slash, e.g. `https://hr.example.com/api`.
    pub fn new(base_url: impl Into<String>, session: SessionToken) -> Self {
        let client = reqwest::Client::builder()
            .timeout(IDENTITY_TIMEOUT)
            .build()
            .expect("identity HTTP client with a static timeout must build");
        Self {
            base_url: base_url.into(),
            client,
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn network_error(err: reqwest::Error) -> AuthError {
        AuthError::Network(err.to_string())
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await
            .map_err(Self::network_error)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                "invalid email or password".to_string()
            } else {
                body
            };
            return Err(AuthError::InvalidCredentials(message));
        }
        if !status.is_success() {
            return Err(AuthError::Network(format!(
                "login failed with status {status}"
            )));
        }

        let login: LoginResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        self.session.set(login.token.clone());
        Ok(login)
    }

    async fn fetch_identity(&self) -> Result<IdentityPayload, AuthError> {
        let mut req = self.client.get(self.url("/auth/identity"));
        if let Some(token) = self.session.get() {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(Self::network_error)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AuthError::SessionExpired);
        }
        if !status.is_success() {
            return Err(AuthError::Network(format!(
                "identity fetch failed with status {status}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let mut req = self.client.post(self.url("/auth/logout"));
        if let Some(token) = self.session.get() {
            req = req.bearer_auth(token);
        }

        // The credential is dropped locally no matter what the server says.
        self.session.clear();

        let resp = req.send().await.map_err(Self::network_error)?;
        if !resp.status().is_success() {
            return Err(AuthError::Network(format!(
                "logout failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
