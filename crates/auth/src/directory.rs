//! Lookup contract the authorization core consumes from persistence.
//!
//! Role markers are side records keyed by the same id as the account. The
//! core only ever reads them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PrincipalId;

/// Minimal view of an account: enough to prove it still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: PrincipalId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministratorMarker {
    pub id: PrincipalId,
    #[serde(rename = "securityLevel")]
    pub security_level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerMarker {
    pub id: PrincipalId,
    pub description: Option<String>,
}

/// The lookup backend itself failed (as opposed to "no such record").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("principal directory unavailable: {0}")]
pub struct DirectoryError(pub String);

/// `Ok(None)` means "not found"; `Err` means the backend could not answer.
#[async_trait::async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>, DirectoryError>;

    async fn find_administrator(
        &self,
        id: PrincipalId,
    ) -> Result<Option<AdministratorMarker>, DirectoryError>;

    async fn find_organizer(&self, id: PrincipalId) -> Result<Option<OrganizerMarker>, DirectoryError>;
}

#[async_trait::async_trait]
impl<D> PrincipalDirectory for Arc<D>
where
    D: PrincipalDirectory + ?Sized,
{
    async fn find_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>, DirectoryError> {
        (**self).find_principal(id).await
    }

    async fn find_administrator(
        &self,
        id: PrincipalId,
    ) -> Result<Option<AdministratorMarker>, DirectoryError> {
        (**self).find_administrator(id).await
    }

    async fn find_organizer(&self, id: PrincipalId) -> Result<Option<OrganizerMarker>, DirectoryError> {
        (**self).find_organizer(id).await
    }
}
