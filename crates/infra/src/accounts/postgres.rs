//! Postgres-backed account store.
//!
//! Three tables: `users`, plus `administrator` and `organizer` marker tables
//! keyed by the user id. Markers cascade on user deletion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, error};

use castle_auth::{
    AdministratorMarker, DirectoryError, OrganizerMarker, PrincipalDirectory, PrincipalId,
    PrincipalRecord, Role,
};

use super::{Account, AccountError, AccountStore, NewAccount};

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id                BIGSERIAL PRIMARY KEY,
    username          TEXT NOT NULL UNIQUE,
    email             TEXT NOT NULL UNIQUE,
    password          TEXT NOT NULL,
    registration_date TIMESTAMPTZ NOT NULL,
    last_login_date   TIMESTAMPTZ
)
"#;

const CREATE_ADMINISTRATOR: &str = r#"
CREATE TABLE IF NOT EXISTS administrator (
    id             BIGINT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    security_level INTEGER NOT NULL
)
"#;

const CREATE_ORGANIZER: &str = r#"
CREATE TABLE IF NOT EXISTS organizer (
    id          BIGINT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    description TEXT
)
"#;

const ACCOUNT_COLUMNS: &str = "id, username, email, password, registration_date, last_login_date";

pub struct PostgresAccountStore {
    pool: Arc<PgPool>,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, AccountError> {
        let pool = PgPool::connect(database_url).await.map_err(backend)?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the account tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), AccountError> {
        for statement in [CREATE_USERS, CREATE_ADMINISTRATOR, CREATE_ORGANIZER] {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(backend)?;
        }
        debug!("account schema ready");
        Ok(())
    }

    async fn fetch_account(&self, column: &str, value: &str) -> Result<Option<Account>, AccountError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(account_from_row).transpose()
    }
}

impl core::fmt::Debug for PostgresAccountStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresAccountStore").finish_non_exhaustive()
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, AccountError> {
    Ok(Account {
        id: PrincipalId::new(row.try_get("id").map_err(backend)?),
        username: row.try_get("username").map_err(backend)?,
        email: row.try_get("email").map_err(backend)?,
        password_hash: row.try_get("password").map_err(backend)?,
        registration_date: row.try_get("registration_date").map_err(backend)?,
        last_login_date: row.try_get("last_login_date").map_err(backend)?,
    })
}

fn backend(err: sqlx::Error) -> AccountError {
    error!(error = %err, "account store query failed");
    AccountError::Backend(err.to_string())
}

fn directory(err: sqlx::Error) -> DirectoryError {
    error!(error = %err, "principal lookup failed");
    DirectoryError(err.to_string())
}

/// Translate constraint violations into domain errors.
fn write_error(err: sqlx::Error, id: PrincipalId, username: &str, email: &str, role: Option<Role>) -> AccountError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or_default();
        if db.is_unique_violation() {
            match (constraint, role) {
                ("users_username_key", _) => return AccountError::UsernameTaken(username.to_string()),
                ("users_email_key", _) => return AccountError::EmailTaken(email.to_string()),
                (_, Some(role)) => return AccountError::MarkerExists(id, role),
                _ => {}
            }
        }
        if db.is_foreign_key_violation() {
            return AccountError::NotFound(id);
        }
    }
    backend(err)
}

#[async_trait::async_trait]
impl PrincipalDirectory for PostgresAccountStore {
    async fn find_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>, DirectoryError> {
        let row = sqlx::query("SELECT id, username FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(directory)?;

        row.map(|row| {
            Ok(PrincipalRecord {
                id: PrincipalId::new(row.try_get("id").map_err(directory)?),
                username: row.try_get("username").map_err(directory)?,
            })
        })
        .transpose()
    }

    async fn find_administrator(
        &self,
        id: PrincipalId,
    ) -> Result<Option<AdministratorMarker>, DirectoryError> {
        let row = sqlx::query("SELECT id, security_level FROM administrator WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(directory)?;

        row.map(|row| {
            Ok(AdministratorMarker {
                id: PrincipalId::new(row.try_get("id").map_err(directory)?),
                security_level: row.try_get("security_level").map_err(directory)?,
            })
        })
        .transpose()
    }

    async fn find_organizer(&self, id: PrincipalId) -> Result<Option<OrganizerMarker>, DirectoryError> {
        let row = sqlx::query("SELECT id, description FROM organizer WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(directory)?;

        row.map(|row| {
            Ok(OrganizerMarker {
                id: PrincipalId::new(row.try_get("id").map_err(directory)?),
                description: row.try_get("description").map_err(directory)?,
            })
        })
        .transpose()
    }
}

#[async_trait::async_trait]
impl AccountStore for PostgresAccountStore {
    async fn create_account(&self, new: NewAccount, now: DateTime<Utc>) -> Result<Account, AccountError> {
        let sql = format!(
            "INSERT INTO users (username, email, password, registration_date) \
             VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(now)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| write_error(e, PrincipalId::UNAUTHENTICATED, &new.username, &new.email, None))?;

        account_from_row(&row)
    }

    async fn find_account(&self, id: PrincipalId) -> Result<Option<Account>, AccountError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        self.fetch_account("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        self.fetch_account("email", email).await
    }

    async fn update_account(&self, account: &Account) -> Result<(), AccountError> {
        let result = sqlx::query("UPDATE users SET username = $2, email = $3, password = $4 WHERE id = $1")
            .bind(account.id.get())
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password_hash)
            .execute(&*self.pool)
            .await
            .map_err(|e| write_error(e, account.id, &account.username, &account.email, None))?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound(account.id));
        }
        Ok(())
    }

    async fn delete_account(&self, id: PrincipalId) -> Result<bool, AccountError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, AccountError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(account_from_row).collect()
    }

    async fn grant_organizer(&self, marker: OrganizerMarker) -> Result<(), AccountError> {
        sqlx::query("INSERT INTO organizer (id, description) VALUES ($1, $2)")
            .bind(marker.id.get())
            .bind(&marker.description)
            .execute(&*self.pool)
            .await
            .map_err(|e| write_error(e, marker.id, "", "", Some(Role::Organizer)))?;
        Ok(())
    }

    async fn grant_administrator(&self, marker: AdministratorMarker) -> Result<(), AccountError> {
        sqlx::query("INSERT INTO administrator (id, security_level) VALUES ($1, $2)")
            .bind(marker.id.get())
            .bind(marker.security_level)
            .execute(&*self.pool)
            .await
            .map_err(|e| write_error(e, marker.id, "", "", Some(Role::Administrator)))?;
        Ok(())
    }

    async fn record_login(&self, id: PrincipalId, at: DateTime<Utc>) -> Result<(), AccountError> {
        let result = sqlx::query("UPDATE users SET last_login_date = $2 WHERE id = $1")
            .bind(id.get())
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound(id));
        }
        Ok(())
    }
}
