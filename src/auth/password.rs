use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::{config::PasswordConfig, error::AppError};

/// Argon2id hasher with the configured cost.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    pub fn new(cfg: &PasswordConfig) -> Result<Self, AppError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| {
                error!(error = %e, "invalid argon2 params");
                AppError::Crypto(e.to_string())
            })?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AppError::Crypto(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Constant-time check of `plain` against a stored PHC string.
    /// Parameters are read from the hash, so older costs still verify.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AppError::Crypto(e.to_string())
        })?;
        Ok(self
            .argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
pub(crate) fn cheap() -> PasswordService {
    PasswordService::new(&PasswordConfig {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    })
    .expect("cheap params are valid")
}
