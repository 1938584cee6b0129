use thiserror::Error;
use tracing::debug;

use crate::directory::{DirectoryError, PrincipalDirectory};
use crate::{PrincipalId, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No account and no marker exists for the id.
    #[error("principal {0} not found")]
    NotFound(PrincipalId),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Determine the role a principal currently holds.
///
/// Probes administrator, then organizer, then plain account; the first hit
/// wins, so an id present in both marker tables resolves to administrator.
pub async fn resolve_role<D>(directory: &D, id: PrincipalId) -> Result<Role, ResolveError>
where
    D: PrincipalDirectory + ?Sized,
{
    if directory.find_administrator(id).await?.is_some() {
        debug!(principal_id = %id, role = "administrator", "role resolved");
        return Ok(Role::Administrator);
    }

    if directory.find_organizer(id).await?.is_some() {
        debug!(principal_id = %id, role = "organizer", "role resolved");
        return Ok(Role::Organizer);
    }

    if directory.find_principal(id).await?.is_some() {
        debug!(principal_id = %id, role = "user", "role resolved");
        return Ok(Role::User);
    }

    Err(ResolveError::NotFound(id))
}
