//! Session entry points: login, refresh and logout.
//!
//! Called by the login/refresh/logout handlers only. Password checks happen
//! before `login` is reached.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::directory::{DirectoryError, PrincipalDirectory};
use crate::resolve::{resolve_role, ResolveError};
use crate::token::{IssuedToken, TokenError};
use crate::{PrincipalId, RevocationRegistry, Role, TokenCodec};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("token revoked")]
    Revoked,

    #[error("access token presented where a refresh token is required")]
    NotARefreshToken,

    #[error("principal {0} not found")]
    PrincipalNotFound(PrincipalId),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<ResolveError> for SessionError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::NotFound(id) => SessionError::PrincipalNotFound(id),
            ResolveError::Directory(e) => SessionError::Directory(e),
        }
    }
}

/// Access + refresh pair handed out at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub role: Role,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

#[derive(Clone)]
pub struct SessionService {
    codec: Arc<TokenCodec>,
    revocations: Arc<RevocationRegistry>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl core::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionService")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl SessionService {
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

    /// Resolve the principal's current role and mint an access/refresh pair.
    pub async fn login(&self, principal_id: PrincipalId, now: DateTime<Utc>) -> Result<TokenPair, SessionError> {
        let role = resolve_role(self.directory.as_ref(), principal_id).await?;
        let access = self.codec.issue_access(principal_id, role, now)?;
        let refresh = self.codec.issue_refresh(principal_id, now)?;

        info!(principal_id = %principal_id, role = %role, "session opened");
        Ok(TokenPair { role, access, refresh })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The role is resolved again, so marker changes apply from here on.
    pub async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<IssuedToken, SessionError> {
        let claims = self.codec.decode(refresh_token, now)?;

        if self.revocations.is_revoked_at(refresh_token, now) {
            return Err(SessionError::Revoked);
        }
        if !claims.is_refresh() {
            return Err(SessionError::NotARefreshToken);
        }

        let role = resolve_role(self.directory.as_ref(), claims.principal_id).await?;
        let access = self.codec.issue_access(claims.principal_id, role, now)?;

        debug!(principal_id = %claims.principal_id, role = %role, "access token refreshed");
        Ok(access)
    }

    /// Revoke `token` until its own expiry. Already expired tokens are a no-op.
    pub fn logout(&self, token: &str, now: DateTime<Utc>) -> Result<(), SessionError> {
        let claims = match self.codec.decode(token, now) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        self.revocations.revoke(token, claims.expires_at);
        info!(principal_id = %claims.principal_id, refresh = claims.is_refresh(), "token revoked");
        Ok(())
    }
}
