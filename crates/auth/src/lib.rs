//! `castle-auth` — authentication/authorization core.
//!
//! Token codec, role resolution, revocation, the request gate and the
//! ownership rule. Decoupled from HTTP; persistence is reached only through
//! the [`PrincipalDirectory`] lookup contract.

pub mod authorize;
pub mod claims;
pub mod directory;
pub mod gate;
pub mod password;
pub mod principal;
pub mod resolve;
pub mod revocation;
pub mod roles;
pub mod sessions;
pub mod token;

pub use authorize::{is_owner_or_admin, Identity};
pub use claims::TokenClaims;
pub use directory::{AdministratorMarker, DirectoryError, OrganizerMarker, PrincipalDirectory, PrincipalRecord};
pub use gate::{AccessGate, Denial, DenialKind};
pub use password::{hash_password, verify_password, PasswordError, DUMMY_PASSWORD_HASH};
pub use principal::PrincipalId;
pub use resolve::{resolve_role, ResolveError};
pub use revocation::RevocationRegistry;
pub use roles::{role_permitted, Role, UnknownRole};
pub use sessions::{SessionError, SessionService, TokenPair};
pub use token::{IssuedToken, TokenCodec, TokenError, TokenTtls};
