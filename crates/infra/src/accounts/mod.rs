//! Account storage: the concrete side of the principal lookup contract.
//!
//! `AccountStore` extends [`PrincipalDirectory`] with the account management
//! the HTTP layer needs (registration, updates, role markers).

pub mod in_memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use castle_auth::{AdministratorMarker, OrganizerMarker, PrincipalDirectory, PrincipalId, Role};

pub use in_memory::InMemoryAccountStore;
pub use postgres::PostgresAccountStore;

// ─────────────────────────────────────────────────────────────────────────────
// Model
// ─────────────────────────────────────────────────────────────────────────────

/// A registered account. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: PrincipalId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub registration_date: DateTime<Utc>,
    pub last_login_date: Option<DateTime<Utc>>,
}

/// Registration input; the password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("email '{0}' is already registered")]
    EmailTaken(String),

    #[error("account {0} not found")]
    NotFound(PrincipalId),

    #[error("account {0} already holds the {1} role")]
    MarkerExists(PrincipalId, Role),

    #[error("account store failure: {0}")]
    Backend(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Store contract
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
pub trait AccountStore: PrincipalDirectory {
    /// Usernames and emails are unique across accounts.
    async fn create_account(&self, new: NewAccount, now: DateTime<Utc>) -> Result<Account, AccountError>;

    async fn find_account(&self, id: PrincipalId) -> Result<Option<Account>, AccountError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;

    /// Overwrites username, email and password hash of `account.id`.
    async fn update_account(&self, account: &Account) -> Result<(), AccountError>;

    /// Removes the account and any role markers. `false` if it did not exist.
    async fn delete_account(&self, id: PrincipalId) -> Result<bool, AccountError>;

    /// Ordered by id.
    async fn list_accounts(&self) -> Result<Vec<Account>, AccountError>;

    async fn grant_organizer(&self, marker: OrganizerMarker) -> Result<(), AccountError>;

    async fn grant_administrator(&self, marker: AdministratorMarker) -> Result<(), AccountError>;

    async fn record_login(&self, id: PrincipalId, at: DateTime<Utc>) -> Result<(), AccountError>;
}
