use crate::auth::{
    jwt::TokenService,
    password::PasswordService,
    repo::{
        CredentialRepository, InMemoryCredentialRepository, InMemoryUserRepository, UserRepository,
    },
    services::{AccountService, SessionService},
};
use crate::config::AppConfig;
use anyhow::Context;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<AccountService>,
    pub sessions: Arc<SessionService>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config)
    }

    /// Wires the use cases over fresh in-memory stores.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let passwords = PasswordService::new(&config.password).context("password hashing config")?;
        let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
        let credentials: Arc<dyn CredentialRepository> =
            Arc::new(InMemoryCredentialRepository::new());
        let tokens = Arc::new(TokenService::new(&config.jwt));

        let accounts = Arc::new(AccountService::new(
            users.clone(),
            credentials.clone(),
            passwords.clone(),
        ));
        let sessions = Arc::new(SessionService::new(users, credentials, passwords, tokens.clone()));

        Ok(Self {
            config: Arc::new(config),
            tokens,
            accounts,
            sessions,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                previous_secrets: Vec::new(),
                ttl_minutes: 5,
            },
            password: crate::config::PasswordConfig {
                memory_kib: 256,
                iterations: 1,
                parallelism: 1,
            },
        };
        Self::from_config(config).expect("fake state")
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
