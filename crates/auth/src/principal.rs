use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Identity of an account (the `users.id` key shared by every role marker).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(i64);

impl PrincipalId {
    /// Sentinel handed out when no identity is attached to a request.
    ///
    /// Never a valid account id; callers must treat it as "unauthenticated".
    pub const UNAUTHENTICATED: PrincipalId = PrincipalId(-1);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }

    pub fn is_unauthenticated(&self) -> bool {
        *self == Self::UNAUTHENTICATED
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for PrincipalId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<PrincipalId> for i64 {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

impl FromStr for PrincipalId {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(i64::from_str(s)?))
    }
}
