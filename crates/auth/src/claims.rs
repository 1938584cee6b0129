use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{PrincipalId, Role};

/// Decoded, signature-verified claims of an access or refresh token.
///
/// Access tokens always carry a role; refresh tokens never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub principal_id: PrincipalId,
    pub role: Option<Role>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    pub fn is_refresh(&self) -> bool {
        self.role.is_none()
    }

    /// Tokens are dead from their expiry second onwards.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Claim set as it travels inside the token payload.
///
/// The principal id is carried as a decimal string in `sub`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub iat: i64,
    pub exp: i64,
}

impl WireClaims {
    pub(crate) fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            sub: claims.principal_id.to_string(),
            role: claims.role,
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
        }
    }

    /// `None` when the subject is not an integer or a timestamp is out of range.
    pub(crate) fn into_claims(self) -> Option<TokenClaims> {
        let principal_id = self.sub.parse::<PrincipalId>().ok()?;
        let issued_at = Utc.timestamp_opt(self.iat, 0).single()?;
        let expires_at = Utc.timestamp_opt(self.exp, 0).single()?;
        Some(TokenClaims {
            principal_id,
            role: self.role,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_claims_omit_role_on_the_wire() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let claims = TokenClaims {
            principal_id: PrincipalId::new(9),
            role: None,
            issued_at: now,
            expires_at: now + chrono::Duration::hours(24),
        };
        let json = serde_json::to_value(WireClaims::from_claims(&claims)).unwrap();
        assert_eq!(json["sub"], "9");
        assert!(json.get("role").is_none());
        assert!(claims.is_refresh());
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let wire = WireClaims {
            sub: "alice".to_string(),
            role: Some(Role::User),
            iat: 0,
            exp: 10,
        };
        assert!(wire.into_claims().is_none());
    }

    #[test]
    fn expiry_is_inclusive_of_the_expiry_second() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let claims = TokenClaims {
            principal_id: PrincipalId::new(1),
            role: Some(Role::User),
            issued_at: now,
            expires_at: now,
        };
        assert!(claims.is_expired(now));
        assert!(!claims.is_expired(now - chrono::Duration::seconds(1)));
    }
}
