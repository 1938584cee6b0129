//! Token codec: signs and verifies HMAC-SHA256 claim sets.
//!
//! The codec is pure apart from the `now` it is handed; it never consults the
//! revocation registry. Expiry is checked here against the caller's clock so
//! tests can move time deterministically.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{TokenClaims, WireClaims};
use crate::{PrincipalId, Role};

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 600;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 86_400;
/// Ten years.
pub const MAX_TTL_SECS: i64 = 10 * 365 * 86_400;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong algorithm family, unsigned, or signature mismatch.
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// Lifetimes applied by the convenience issuers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TokenTtls {
    pub access: Duration,
    pub refresh: Duration,
}

impl TokenTtls {
    /// `None` when either value does not fit a [`Duration`].
    pub fn try_from_secs(access: i64, refresh: i64) -> Option<Self> {
        Some(Self {
            access: Duration::try_seconds(access)?,
            refresh: Duration::try_seconds(refresh)?,
        })
    }

    /// Values are clamped to `-MAX_TTL_SECS..=MAX_TTL_SECS`.
    pub fn from_secs(access: i64, refresh: i64) -> Self {
        let clamp = |secs: i64| Duration::seconds(secs.clamp(-MAX_TTL_SECS, MAX_TTL_SECS));
        Self {
            access: clamp(access),
            refresh: clamp(refresh),
        }
    }
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self::from_secs(DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS)
    }
}

/// A freshly signed token together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens with the single server-held secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttls: TokenTtls,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttls", &self.ttls)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>, ttls: TokenTtls) -> Self {
        let secret = secret.as_ref();

        // Any HMAC variant verifies; asymmetric or unsigned tokens do not.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttls,
        }
    }

    pub fn ttls(&self) -> TokenTtls {
        self.ttls
    }

    /// Access token with the configured access TTL.
    pub fn issue_access(
        &self,
        principal_id: PrincipalId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_access_with_ttl(principal_id, role, self.ttls.access, now)
    }

    pub fn issue_access_with_ttl(
        &self,
        principal_id: PrincipalId,
        role: Role,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        self.sign(principal_id, Some(role), ttl, now)
    }

    /// Refresh token with the configured refresh TTL. Carries no role.
    pub fn issue_refresh(
        &self,
        principal_id: PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_refresh_with_ttl(principal_id, self.ttls.refresh, now)
    }

    pub fn issue_refresh_with_ttl(
        &self,
        principal_id: PrincipalId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        self.sign(principal_id, None, ttl, now)
    }

    /// Verify the signature and claim shape, then reject expired tokens.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding, &self.validation)
            .map_err(classify)?;

        let claims = data.claims.into_claims().ok_or(TokenError::Malformed)?;
        if claims.is_expired(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(
        &self,
        principal_id: PrincipalId,
        role: Option<Role>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encoding(format!("expiry overflows: {now} + {ttl}")))?;
        let claims = TokenClaims {
            principal_id,
            role,
            issued_at: now,
            expires_at,
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &WireClaims::from_claims(&claims),
            &self.encoding,
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at,
        })
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::MissingAlgorithm => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(secret, TokenTtls::default())
    }

    /// Flip one bit of the decoded signature and re-encode it canonically.
    fn tamper_signature(token: &str, bit: usize) -> String {
        let mut parts: Vec<&str> = token.split('.').collect();
        let mut sig = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
        let bit = bit % (sig.len() * 8);
        sig[bit / 8] ^= 1 << (bit % 8);
        let encoded = URL_SAFE_NO_PAD.encode(sig);
        parts[2] = &encoded;
        parts.join(".")
    }

    #[test]
    fn access_token_round_trips() {
        let codec = codec("secret");
        let now = at(1_700_000_000);
        let issued = codec.issue_access(PrincipalId::new(7), Role::User, now).unwrap();

        let claims = codec.decode(&issued.token, now).unwrap();
        assert_eq!(claims.principal_id, PrincipalId::new(7));
        assert_eq!(claims.role, Some(Role::User));
        assert_eq!(claims.expires_at, now + Duration::seconds(DEFAULT_ACCESS_TTL_SECS));
        assert_eq!(issued.expires_at, claims.expires_at);
    }

    #[test]
    fn token_has_three_segments_and_hs256_header() {
        let codec = codec("secret");
        let issued = codec.issue_access(PrincipalId::new(1), Role::Organizer, at(0)).unwrap();
        assert_eq!(issued.token.split('.').count(), 3);
        let header = jsonwebtoken::decode_header(&issued.token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn refresh_token_has_no_role_and_longer_ttl() {
        let codec = codec("secret");
        let now = at(1_700_000_000);
        let access = codec.issue_access(PrincipalId::new(3), Role::User, now).unwrap();
        let refresh = codec.issue_refresh(PrincipalId::new(3), now).unwrap();

        let claims = codec.decode(&refresh.token, now).unwrap();
        assert!(claims.role.is_none());
        assert!(refresh.expires_at > access.expires_at);
    }

    #[test]
    fn zero_and_negative_ttl_are_expired_immediately() {
        let codec = codec("secret");
        let now = at(1_700_000_000);
        for ttl in [0, -1, -3600] {
            let issued = codec
                .issue_access_with_ttl(PrincipalId::new(1), Role::User, Duration::seconds(ttl), now)
                .unwrap();
            assert_eq!(codec.decode(&issued.token, now), Err(TokenError::Expired));
        }
    }

    #[test]
    fn token_expires_once_ttl_elapses() {
        let codec = codec("secret");
        let now = at(1_700_000_000);
        let issued = codec.issue_access(PrincipalId::new(1), Role::User, now).unwrap();

        assert!(codec.decode(&issued.token, now + Duration::seconds(599)).is_ok());
        assert_eq!(
            codec.decode(&issued.token, now + Duration::seconds(600)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let issued = codec("one").issue_access(PrincipalId::new(1), Role::User, at(0)).unwrap();
        assert_eq!(
            codec("two").decode(&issued.token, at(0)),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn hs512_tokens_with_the_right_secret_are_accepted() {
        let wire = WireClaims {
            sub: "5".to_string(),
            role: Some(Role::Organizer),
            iat: 0,
            exp: 100,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &wire,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let claims = codec("secret").decode(&token, at(10)).unwrap();
        assert_eq!(claims.principal_id, PrincipalId::new(5));
        assert_eq!(claims.role, Some(Role::Organizer));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"1","role":"administrator","iat":0,"exp":9999999999}"#);
        let token = format!("{header}.{payload}.");
        assert!(codec("secret").decode(&token, at(10)).is_err());
    }

    #[test]
    fn ttl_past_the_calendar_is_an_encoding_error() {
        let codec = codec("secret");
        let huge = Duration::try_seconds(10_000_000_000_000).unwrap();
        assert!(matches!(
            codec.issue_access_with_ttl(PrincipalId::new(1), Role::User, huge, at(0)),
            Err(TokenError::Encoding(_))
        ));
        assert!(matches!(
            codec.issue_refresh_with_ttl(PrincipalId::new(1), huge, at(0)),
            Err(TokenError::Encoding(_))
        ));
    }

    #[test]
    fn ttls_out_of_duration_range_are_refused_or_clamped() {
        assert_eq!(TokenTtls::try_from_secs(i64::MAX, 60), None);
        assert_eq!(TokenTtls::try_from_secs(60, i64::MAX), None);
        assert_eq!(
            TokenTtls::try_from_secs(60, 120),
            Some(TokenTtls::from_secs(60, 120))
        );

        let clamped = TokenTtls::from_secs(i64::MAX, i64::MIN);
        assert_eq!(clamped.access, Duration::seconds(MAX_TTL_SECS));
        assert_eq!(clamped.refresh, Duration::seconds(-MAX_TTL_SECS));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec("secret");
        assert_eq!(codec.decode("not-a-token", at(0)), Err(TokenError::Malformed));
        assert_eq!(codec.decode("", at(0)), Err(TokenError::Malformed));
    }

    #[test]
    fn signed_claims_with_non_numeric_subject_are_malformed() {
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "sub": "alice", "role": "user", "iat": 0, "exp": 100 }),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(codec("secret").decode(&token, at(1)), Err(TokenError::Malformed));
    }

    #[test]
    fn signed_claims_with_unknown_role_are_malformed() {
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "sub": "1", "role": "root", "iat": 0, "exp": 100 }),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(codec("secret").decode(&token, at(1)), Err(TokenError::Malformed));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Administrator), Just(Role::Organizer), Just(Role::User)]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

        #[test]
        fn round_trip_recovers_identity_and_expiry(
            id in any::<i64>(),
            role in any_role(),
            ttl in 1i64..=31_536_000,
            issued in 0i64..=4_000_000_000,
        ) {
            let codec = codec("prop-secret");
            let now = at(issued);
            let token = codec
                .issue_access_with_ttl(PrincipalId::new(id), role, Duration::seconds(ttl), now)
                .unwrap();
            let claims = codec.decode(&token.token, now).unwrap();
            prop_assert_eq!(claims.principal_id, PrincipalId::new(id));
            prop_assert_eq!(claims.role, Some(role));
            prop_assert_eq!(claims.expires_at, now + Duration::seconds(ttl));
        }

        #[test]
        fn any_flipped_signature_bit_is_rejected(
            id in any::<i64>(),
            secret in "[a-zA-Z0-9]{1,32}",
            bit in 0usize..256,
        ) {
            let codec = codec(&secret);
            let now = at(1_700_000_000);
            let token = codec.issue_access(PrincipalId::new(id), Role::User, now).unwrap();
            let tampered = tamper_signature(&token.token, bit);
            prop_assert_eq!(codec.decode(&tampered, now), Err(TokenError::InvalidSignature));
        }
    }
}
