use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use castle_auth::{
    AdministratorMarker, DirectoryError, OrganizerMarker, PrincipalDirectory, PrincipalId,
    PrincipalRecord, Role,
};

use super::{Account, AccountError, AccountStore, NewAccount};

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    accounts: BTreeMap<PrincipalId, Account>,
    administrators: HashMap<PrincipalId, AdministratorMarker>,
    organizers: HashMap<PrincipalId, OrganizerMarker>,
}

impl Tables {
    fn conflict(&self, id: Option<PrincipalId>, username: &str, email: &str) -> Option<AccountError> {
        let others = self.accounts.values().filter(|a| Some(a.id) != id);
        for other in others {
            if other.username == username {
                return Some(AccountError::UsernameTaken(username.to_string()));
            }
            if other.email == email {
                return Some(AccountError::EmailTaken(email.to_string()));
            }
        }
        None
    }
}

/// In-memory account store for tests/dev. Ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<Tables>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, String> {
        self.inner.read().map_err(|_| "account table lock poisoned".to_string())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, String> {
        self.inner.write().map_err(|_| "account table lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl PrincipalDirectory for InMemoryAccountStore {
    async fn find_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>, DirectoryError> {
        let tables = self.read().map_err(DirectoryError)?;
        Ok(tables.accounts.get(&id).map(|a| PrincipalRecord {
            id: a.id,
            username: a.username.clone(),
        }))
    }

    async fn find_administrator(
        &self,
        id: PrincipalId,
    ) -> Result<Option<AdministratorMarker>, DirectoryError> {
        let tables = self.read().map_err(DirectoryError)?;
        Ok(tables.administrators.get(&id).cloned())
    }

    async fn find_organizer(&self, id: PrincipalId) -> Result<Option<OrganizerMarker>, DirectoryError> {
        let tables = self.read().map_err(DirectoryError)?;
        Ok(tables.organizers.get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create_account(&self, new: NewAccount, now: DateTime<Utc>) -> Result<Account, AccountError> {
        let mut tables = self.write().map_err(AccountError::Backend)?;
        if let Some(conflict) = tables.conflict(None, &new.username, &new.email) {
            return Err(conflict);
        }

        tables.last_id += 1;
        let account = Account {
            id: PrincipalId::new(tables.last_id),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            registration_date: now,
            last_login_date: None,
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: PrincipalId) -> Result<Option<Account>, AccountError> {
        let tables = self.read().map_err(AccountError::Backend)?;
        Ok(tables.accounts.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        let tables = self.read().map_err(AccountError::Backend)?;
        Ok(tables.accounts.values().find(|a| a.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let tables = self.read().map_err(AccountError::Backend)?;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn update_account(&self, account: &Account) -> Result<(), AccountError> {
        let mut tables = self.write().map_err(AccountError::Backend)?;
        if !tables.accounts.contains_key(&account.id) {
            return Err(AccountError::NotFound(account.id));
        }
        if let Some(conflict) = tables.conflict(Some(account.id), &account.username, &account.email) {
            return Err(conflict);
        }

        if let Some(existing) = tables.accounts.get_mut(&account.id) {
            existing.username = account.username.clone();
            existing.email = account.email.clone();
            existing.password_hash = account.password_hash.clone();
        }
        Ok(())
    }

    async fn delete_account(&self, id: PrincipalId) -> Result<bool, AccountError> {
        let mut tables = self.write().map_err(AccountError::Backend)?;
        tables.administrators.remove(&id);
        tables.organizers.remove(&id);
        Ok(tables.accounts.remove(&id).is_some())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, AccountError> {
        let tables = self.read().map_err(AccountError::Backend)?;
        Ok(tables.accounts.values().cloned().collect())
    }

    async fn grant_organizer(&self, marker: OrganizerMarker) -> Result<(), AccountError> {
        let mut tables = self.write().map_err(AccountError::Backend)?;
        if !tables.accounts.contains_key(&marker.id) {
            return Err(AccountError::NotFound(marker.id));
        }
        if tables.organizers.contains_key(&marker.id) {
            return Err(AccountError::MarkerExists(marker.id, Role::Organizer));
        }
        tables.organizers.insert(marker.id, marker);
        Ok(())
    }

    async fn grant_administrator(&self, marker: AdministratorMarker) -> Result<(), AccountError> {
        let mut tables = self.write().map_err(AccountError::Backend)?;
        if !tables.accounts.contains_key(&marker.id) {
            return Err(AccountError::NotFound(marker.id));
        }
        if tables.administrators.contains_key(&marker.id) {
            return Err(AccountError::MarkerExists(marker.id, Role::Administrator));
        }
        tables.administrators.insert(marker.id, marker);
        Ok(())
    }

    async fn record_login(&self, id: PrincipalId, at: DateTime<Utc>) -> Result<(), AccountError> {
        let mut tables = self.write().map_err(AccountError::Backend)?;
        let account = tables.accounts.get_mut(&id).ok_or(AccountError::NotFound(id))?;
        account.last_login_date = Some(at);
        Ok(())
    }
}
