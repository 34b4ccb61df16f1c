//! The closed role set.
//!
//! Roles are a fixed enumeration in this system; the backend maps them to
//! capability tokens and returns the aggregated union, so nothing here
//! expands roles into permissions.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A role held by a principal. A principal may hold several simultaneously;
/// its capability set is always the union across all of them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    HrManager,
    Supervisor,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::HrManager => "hr_manager",
            Role::Supervisor => "supervisor",
            Role::Employee => "employee",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "hr_manager" => Ok(Role::HrManager),
            "supervisor" => Ok(Role::Supervisor),
            "employee" => Ok(Role::Employee),
            other => Err(UnknownRoleError(other.to_string())),
        }
    }
}
