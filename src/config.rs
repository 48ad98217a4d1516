use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Secrets accepted for verification only, so tokens survive a rotation.
    pub previous_secrets: Vec<String>,
    pub ttl_minutes: u32,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = PasswordConfig::default();
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            previous_secrets: std::env::var("JWT_PREVIOUS_SECRETS")
                .map(|v| split_secrets(&v))
                .unwrap_or_default(),
            ttl_minutes: positive(env_or("JWT_TTL_MINUTES", 60 * 24)?, "JWT_TTL_MINUTES")?,
        };
        let password = PasswordConfig {
            memory_kib: env_or("PASSWORD_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_or("PASSWORD_ITERATIONS", defaults.iterations)?,
            parallelism: env_or("PASSWORD_PARALLELISM", defaults.parallelism)?,
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
            jwt,
            password,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {v:?}")),
        Err(_) => Ok(default),
    }
}

fn positive(value: u32, key: &str) -> anyhow::Result<u32> {
    anyhow::ensure!(value > 0, "{key} must be greater than zero");
    Ok(value)
}

fn split_secrets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
