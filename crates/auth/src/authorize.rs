//! Request identity and the ownership rule.

use serde::Serialize;

use crate::{PrincipalId, Role};

/// Identity attached to a request once the gate has admitted it.
///
/// Lives for one request only. Ownership decisions take it as an explicit
/// argument, so they cannot run before a successful gate pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    principal_id: PrincipalId,
    role: Role,
}

impl Identity {
    pub fn new(principal_id: PrincipalId, role: Role) -> Self {
        Self { principal_id, role }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// See [`is_owner_or_admin`].
    pub fn may_modify(&self, owner_id: PrincipalId) -> bool {
        is_owner_or_admin(self, owner_id)
    }
}

/// Administrators may act on any resource; everyone else only on their own.
///
/// Advisory: the caller decides what a `false` means at the HTTP level.
pub fn is_owner_or_admin(identity: &Identity, owner_id: PrincipalId) -> bool {
    identity.role.is_administrator() || identity.principal_id == owner_id
}
