//! Resolved caller identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Staff role governing which operations a caller may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    PracticeAdmin,
    Manager,
    Dentist,
    Hygienist,
    Receptionist,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::PracticeAdmin,
        Role::Manager,
        Role::Dentist,
        Role::Hygienist,
        Role::Receptionist,
    ];

    /// Wire names, in the same order as [`Role::ALL`].
    pub const NAMES: &'static [&'static str] = &[
        "super_admin",
        "practice_admin",
        "manager",
        "dentist",
        "hygienist",
        "receptionist",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::PracticeAdmin => "practice_admin",
            Role::Manager => "manager",
            Role::Dentist => "dentist",
            Role::Hygienist => "hygienist",
            Role::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The authenticated caller for one request.
///
/// Built by the auth resolver from a verified credential and the caller's
/// profile, stored in request extensions, and dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}
