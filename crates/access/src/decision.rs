//! The access decision model and its wire representation.

use serde::{Deserialize, Serialize};

use peopleops_core::{PageId, ResourceId};

/// The capability being exercised against a surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Verb {
    View,
    Edit,
    Create,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::View => "view",
            Verb::Edit => "edit",
            Verb::Create => "create",
            Verb::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Verb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating a (page, resource, principal) triple.
///
/// # Invariants
/// - The four verdicts are independent: an entity may be viewable but not
///   editable, or creatable without being viewable (create-only forms).
/// - `unreachable` distinguishes "the check itself failed" from "policy
///   said no" without touching the booleans, so callers that branch only
///   on verdicts always fail closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_create: bool,
    pub can_delete: bool,
    /// Human-readable denial explanation.
    pub message: String,
    /// Role the oracle evaluated the request under, when reported.
    pub user_role: Option<String>,
    /// Capability tokens that would have satisfied the request, as wire
    /// strings (kept raw for operator-facing diagnostics).
    pub required_capabilities: Vec<String>,
    /// True when the decision is a fail-closed placeholder for an oracle
    /// that could not be consulted, rather than an authoritative denial.
    pub unreachable: bool,
}

impl Decision {
    /// Denial-by-default: all four verdicts false, policy said no.
    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            can_view: false,
            can_edit: false,
            can_create: false,
            can_delete: false,
            message: message.into(),
            user_role: None,
            required_capabilities: Vec::new(),
            unreachable: false,
        }
    }

    /// Denial-by-default because the check itself failed.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            unreachable: true,
            ..Self::denied(message)
        }
    }

    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required_capabilities = required;
        self
    }

    /// The verdict for one requested capability.
    pub fn verdict(&self, verb: Verb) -> bool {
        match verb {
            Verb::View => self.can_view,
            Verb::Edit => self.can_edit,
            Verb::Create => self.can_create,
            Verb::Delete => self.can_delete,
        }
    }

    /// Operator-facing denial explanation including the missing
    /// required-capability list.
    pub fn explanation(&self) -> String {
        if self.required_capabilities.is_empty() {
            self.message.clone()
        } else {
            format!(
                "{} (required: {})",
                self.message,
                self.required_capabilities.join(", ")
            )
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

/// Decision request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub page_identifier: PageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<i64>,
}

impl DecisionRequest {
    pub fn new(page: PageId, resource: Option<ResourceId>) -> Self {
        Self {
            page_identifier: page,
            resource_id: resource.map(i64::from),
        }
    }
}

/// The nested verdict object of the decision response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsPayload {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_create: bool,
    pub can_delete: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub required_permissions: Vec<String>,
}

/// Decision response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub page_identifier: PageId,
    #[serde(default)]
    pub resource_id: Option<i64>,
    pub access_granted: bool,
    pub permissions: PermissionsPayload,
}

impl From<DecisionResponse> for Decision {
    fn from(resp: DecisionResponse) -> Self {
        let p = resp.permissions;
        Self {
            can_view: p.can_view,
            can_edit: p.can_edit,
            can_create: p.can_create,
            can_delete: p.can_delete,
            message: p.message,
            user_role: p.user_role,
            required_capabilities: p.required_permissions,
            unreachable: false,
        }
    }
}
