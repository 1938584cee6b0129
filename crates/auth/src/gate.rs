//! Authorization gate: the per-request guard.
//!
//! A request is admitted only after every step passes: token present,
//! signature and expiry valid, not revoked, an access (not refresh) token,
//! principal still exists, role within the required set. Any failure is a
//! terminal denial; the gate never retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::directory::PrincipalDirectory;
use crate::roles::role_permitted;
use crate::token::TokenError;
use crate::{Identity, PrincipalId, RevocationRegistry, Role, TokenCodec};

/// Coarse class of a denial; the only thing callers get to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Missing or untrustworthy credential.
    Unauthenticated,
    /// Valid credential, insufficient privilege.
    Forbidden,
    /// The principal lookup backend could not answer.
    Unavailable,
}

/// Precise reason a request was denied. For operator logs only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Denial {
    #[error("no bearer token presented")]
    MissingToken,

    #[error("token signature invalid")]
    InvalidSignature,

    #[error("token malformed")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("token revoked")]
    Revoked,

    /// Refresh tokens carry no role and never pass the gate.
    #[error("token carries no role")]
    MissingRole,

    #[error("principal {0} no longer exists")]
    PrincipalNotFound(PrincipalId),

    #[error("role '{role}' not permitted (required one of {required:?})")]
    RoleNotPermitted { role: Role, required: Vec<Role> },

    #[error("principal directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl Denial {
    pub fn kind(&self) -> DenialKind {
        match self {
            Denial::RoleNotPermitted { .. } => DenialKind::Forbidden,
            Denial::DirectoryUnavailable(_) => DenialKind::Unavailable,
            _ => DenialKind::Unauthenticated,
        }
    }
}

impl From<TokenError> for Denial {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::InvalidSignature => Denial::InvalidSignature,
            TokenError::Expired => Denial::Expired,
            TokenError::Malformed | TokenError::Encoding(_) => Denial::Malformed,
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    codec: Arc<TokenCodec>,
    revocations: Arc<RevocationRegistry>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl core::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessGate")
            .field("codec", &self.codec)
            .field("revoked_entries", &self.revocations.len())
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<RevocationRegistry>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Self {
        Self {
            codec,
            revocations,
            directory,
        }
    }

    /// Admit or deny one request. An empty `required` set admits any role.
    ///
    /// Every denial is logged with its precise cause before returning.
    pub async fn admit(
        &self,
        token: Option<&str>,
        required: &[Role],
        now: DateTime<Utc>,
    ) -> Result<Identity, Denial> {
        let result = self.evaluate(token, required, now).await;
        if let Err(denial) = &result {
            warn!(cause = %denial, kind = ?denial.kind(), "request denied");
        }
        result
    }

    async fn evaluate(
        &self,
        token: Option<&str>,
        required: &[Role],
        now: DateTime<Utc>,
    ) -> Result<Identity, Denial> {
        let token = token.filter(|t| !t.is_empty()).ok_or(Denial::MissingToken)?;

        let claims = self.codec.decode(token, now)?;

        if self.revocations.is_revoked_at(token, now) {
            return Err(Denial::Revoked);
        }

        let role = claims.role.ok_or(Denial::MissingRole)?;
        let principal_id = claims.principal_id;

        match self.directory.find_principal(principal_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(Denial::PrincipalNotFound(principal_id)),
            Err(e) => return Err(Denial::DirectoryUnavailable(e.0)),
        }

        if !role_permitted(role, required) {
            return Err(Denial::RoleNotPermitted {
                role,
                required: required.to_vec(),
            });
        }

        Ok(Identity::new(principal_id, role))
    }
}
