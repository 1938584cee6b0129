use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role held by an authenticated principal.
///
/// The set is closed: an account is a plain `User` unless an administrator or
/// organizer marker exists for its id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Organizer,
    User,
}

impl Role {
    /// All roles, highest precedence first.
    pub const ALL: [Role; 3] = [Role::Administrator, Role::Organizer, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Organizer => "organizer",
            Role::User => "user",
        }
    }

    /// Precedence rank; higher wins when a principal holds several markers.
    pub fn precedence(&self) -> u8 {
        match self {
            Role::Administrator => 2,
            Role::Organizer => 1,
            Role::User => 0,
        }
    }

    pub fn is_administrator(&self) -> bool {
        matches!(self, Role::Administrator)
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence().cmp(&other.precedence())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(Role::Administrator),
            "organizer" => Ok(Role::Organizer),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Does `role` satisfy a handler's required-role set?
///
/// An empty set admits any authenticated principal.
pub fn role_permitted(role: Role, required: &[Role]) -> bool {
    required.is_empty() || required.contains(&role)
}
