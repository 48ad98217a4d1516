use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::auth::repo_types::{Credential, User};
use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Assigns the next id and stores the user. Fails if the email is taken.
    async fn create(&self, user: User) -> StoreResult<User>;
    async fn find_by_id(&self, id: i64) -> StoreResult<User>;
    async fn find_by_email(&self, email: &str) -> StoreResult<User>;
    /// Undoes a `create` when the rest of a registration fails.
    async fn remove(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Assigns the next id. At most one credential per user id.
    async fn create(&self, credential: Credential) -> StoreResult<Credential>;
    async fn find_by_user_id(&self, user_id: i64) -> StoreResult<Credential>;
    async fn update_token(
        &self,
        user_id: i64,
        token: &str,
        login_at: OffsetDateTime,
    ) -> StoreResult<()>;
    async fn clear_token(&self, user_id: i64, logout_at: OffsetDateTime) -> StoreResult<()>;
}

#[derive(Default)]
struct UserTable {
    counter: i64,
    by_id: HashMap<i64, User>,
    id_by_email: HashMap<String, i64>,
}

/// Users keyed by id, with a secondary index on email.
#[derive(Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, mut user: User) -> StoreResult<User> {
        let mut table = self.inner.write().await;
        if table.id_by_email.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        table.counter += 1;
        user.id = table.counter;
        table.id_by_email.insert(user.email.clone(), user.id);
        table.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<User> {
        let table = self.inner.read().await;
        table.by_id.get(&id).cloned().ok_or(StoreError::UserNotFound)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<User> {
        let table = self.inner.read().await;
        table
            .id_by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .cloned()
            .ok_or(StoreError::UserNotFound)
    }

    async fn remove(&self, id: i64) -> StoreResult<()> {
        let mut table = self.inner.write().await;
        let user = table.by_id.remove(&id).ok_or(StoreError::UserNotFound)?;
        table.id_by_email.remove(&user.email);
        Ok(())
    }
}

#[derive(Default)]
struct CredentialTable {
    counter: i64,
    by_user: HashMap<i64, Credential>,
}

#[derive(Default)]
pub struct InMemoryCredentialRepository {
    inner: RwLock<CredentialTable>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn create(&self, mut credential: Credential) -> StoreResult<Credential> {
        let mut table = self.inner.write().await;
        if table.by_user.contains_key(&credential.user_id) {
            return Err(StoreError::DuplicateCredential(credential.user_id));
        }
        table.counter += 1;
        credential.id = table.counter;
        table.by_user.insert(credential.user_id, credential.clone());
        Ok(credential)
    }

    async fn find_by_user_id(&self, user_id: i64) -> StoreResult<Credential> {
        let table = self.inner.read().await;
        table
            .by_user
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::CredentialNotFound)
    }

    async fn update_token(
        &self,
        user_id: i64,
        token: &str,
        login_at: OffsetDateTime,
    ) -> StoreResult<()> {
        let mut table = self.inner.write().await;
        let credential = table
            .by_user
            .get_mut(&user_id)
            .ok_or(StoreError::CredentialNotFound)?;
        credential.token = token.to_string();
        credential.login_at = Some(login_at);
        Ok(())
    }

    async fn clear_token(&self, user_id: i64, logout_at: OffsetDateTime) -> StoreResult<()> {
        let mut table = self.inner.write().await;
        let credential = table
            .by_user
            .get_mut(&user_id)
            .ok_or(StoreError::CredentialNotFound)?;
        credential.token.clear();
        credential.logout_at = Some(logout_at);
        Ok(())
    }
}
