//! The live authenticated principal.

use peopleops_core::{PrincipalId, ResourceId};

use crate::api::IdentityPayload;
use crate::capability::{CapabilityParseError, CapabilitySet};
use crate::roles::Role;

/// The authenticated identity and its aggregated role/capability state.
///
/// # Invariants
/// - Exactly one live `Principal` exists per active session.
/// - `capabilities` is the union across all held roles, already aggregated
///   by the identity endpoint — never role-exclusive.
/// - Roles are deduplicated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    /// The employee record this session is bound to, when the principal is
    /// an employee (admin service accounts may have none).
    pub employee_id: Option<ResourceId>,
    pub roles: Vec<Role>,
    pub capabilities: CapabilitySet,
    pub authenticated: bool,
}

impl Principal {
    /// Build a principal from the identity endpoint's payload.
    ///
    /// Unknown role strings are dropped with a warning (a newer backend may
    /// know roles this client does not); malformed capability tokens are a
    /// hard error — a principal with a misparsed permission set must not be
    /// considered live.
    pub fn from_payload(payload: &IdentityPayload) -> Result<Self, CapabilityParseError> {
        let mut roles: Vec<Role> = Vec::with_capacity(payload.roles.len());
        for raw in &payload.roles {
            match raw.parse::<Role>() {
                Ok(role) => {
                    if !roles.contains(&role) {
                        roles.push(role);
                    }
                }
                Err(err) => {
                    tracing::warn!("ignoring unrecognized role in identity payload: {err}");
                }
            }
        }

        let capabilities = CapabilitySet::parse(&payload.capabilities)?;

        Ok(Self {
            principal_id: payload.principal_id,
            employee_id: payload.employee_id.map(ResourceId::from),
            roles,
            capabilities,
            authenticated: true,
        })
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
