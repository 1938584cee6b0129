use castle_auth::{Identity, PrincipalId};

/// Principal id of the admitted caller, or [`PrincipalId::UNAUTHENTICATED`]
/// when no identity is attached to the request.
pub fn current_principal_id(identity: Option<&Identity>) -> PrincipalId {
    identity
        .map(Identity::principal_id)
        .unwrap_or(PrincipalId::UNAUTHENTICATED)
}
