use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::auth::{
    dto::{LoginResponse, LogoutResponse, UserResponse},
    jwt::TokenService,
    password::PasswordService,
    repo::{CredentialRepository, UserRepository},
    repo_types::{Credential, User},
};
use crate::error::{AppError, StoreError};

/// Registration and profile lookup.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialRepository>,
    passwords: PasswordService,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialRepository>,
        passwords: PasswordService,
    ) -> Self {
        Self {
            users,
            credentials,
            passwords,
        }
    }

    /// Creates a user and its credential as a pair.
    ///
    /// The password is hashed before anything is written, and the user is
    /// removed again if its credential cannot be stored.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserResponse, AppError> {
        if self.users.find_by_email(email).await.is_ok() {
            return Err(duplicate_email());
        }

        let hash = self.passwords.hash(password)?;

        let user = match self.users.create(User::new(name, email)).await {
            Ok(u) => u,
            // lost a race with a concurrent registration
            Err(StoreError::DuplicateEmail) => return Err(duplicate_email()),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.credentials.create(Credential::new(user.id, hash)).await {
            error!(error = %e, user_id = user.id, "credential create failed; rolling back user");
            if let Err(undo) = self.users.remove(user.id).await {
                error!(error = %undo, user_id = user.id, "rollback failed");
            }
            return Err(e.into());
        }

        info!(user_id = user.id, "user registered");
        Ok(UserResponse::from(user))
    }

    pub async fn get_by_id(&self, user_id: i64) -> Result<UserResponse, AppError> {
        match self.users.find_by_id(user_id).await {
            Ok(user) => Ok(UserResponse::from(user)),
            Err(StoreError::UserNotFound) => Err(AppError::NotFound("user not found".into())),
            Err(e) => Err(e.into()),
        }
    }
}

fn duplicate_email() -> AppError {
    AppError::Conflict("email already registered".into())
}

/// Login and logout.
///
/// Logout only clears the stored token. Issued tokens are not revoked and
/// keep verifying until they expire.
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialRepository>,
    passwords: PasswordService,
    tokens: Arc<TokenService>,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialRepository>,
        passwords: PasswordService,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            credentials,
            passwords,
            tokens,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let user = match self.users.find_by_email(email).await {
            Ok(u) => u,
            Err(StoreError::UserNotFound) => {
                warn!("login unknown email");
                return Err(AppError::invalid_credentials());
            }
            Err(e) => return Err(e.into()),
        };

        let credential = match self.credentials.find_by_user_id(user.id).await {
            Ok(c) => c,
            Err(StoreError::CredentialNotFound) => {
                warn!(user_id = user.id, "login user without credential");
                return Err(AppError::invalid_credentials());
            }
            Err(e) => return Err(e.into()),
        };

        if !self.passwords.verify(password, &credential.password_hash)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AppError::invalid_credentials());
        }

        let token = self.tokens.issue(user.id, &user.email)?;
        self.credentials
            .update_token(user.id, &token, OffsetDateTime::now_utc())
            .await?;

        info!(user_id = user.id, "user logged in");
        Ok(LoginResponse { token })
    }

    pub async fn logout(&self, user_id: i64) -> Result<LogoutResponse, AppError> {
        self.credentials
            .clear_token(user_id, OffsetDateTime::now_utc())
            .await?;
        info!(user_id, "user logged out");
        Ok(LogoutResponse {
            message: "Logout successful".into(),
        })
    }
}
