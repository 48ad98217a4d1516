use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{config::JwtConfig, error::AppError};

/// Claims carried by every bearer token.
///
/// `user_id` stays a raw JSON value on the way in: tokens minted elsewhere
/// may carry it as a number or as a numeric string.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Value,
    pub email: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Verified token contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: i64,
    pub email: String,
}

/// Issues and verifies HS256 tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    // current secret first, then previous ones
    decoding: Vec<DecodingKey>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(cfg: &JwtConfig) -> Self {
        let decoding = std::iter::once(&cfg.secret)
            .chain(cfg.previous_secrets.iter())
            .map(|s| DecodingKey::from_secret(s.as_bytes()))
            .collect();
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding,
            ttl: Duration::from_secs(u64::from(cfg.ttl_minutes) * 60),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, AppError> {
        self.issue_at(user_id, email, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: i64,
        email: &str,
        now: OffsetDateTime,
    ) -> Result<String, AppError> {
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or_else(|| AppError::Crypto("token expiry out of range".into()))?;
        let claims = Claims {
            user_id: Value::from(user_id),
            email: email.to_string(),
            iat: Some(now.unix_timestamp()),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Crypto(e.to_string()))?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<TokenSubject, AppError> {
        // Pinning the algorithm list rejects "none" and asymmetric substitutions.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let mut last_err = None;
        for key in &self.decoding {
            match decode::<Claims>(token, key, &validation) {
                Ok(data) => {
                    let user_id = parse_user_id(&data.claims.user_id)?;
                    debug!(user_id, "jwt verified");
                    return Ok(TokenSubject {
                        user_id,
                        email: data.claims.email,
                    });
                }
                Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => last_err = Some(e),
                Err(e) => {
                    warn!(error = %e, "token rejected");
                    return Err(AppError::invalid_token());
                }
            }
        }
        if let Some(e) = last_err {
            warn!(error = %e, "token rejected");
        }
        Err(AppError::invalid_token())
    }

    pub fn resolve_user_id(&self, token: &str) -> Result<i64, AppError> {
        self.verify(token).map(|s| s.user_id)
    }
}

fn parse_user_id(raw: &Value) -> Result<i64, AppError> {
    let id = match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    id.ok_or_else(|| {
        warn!(user_id = %raw, "unusable user_id claim");
        AppError::invalid_token()
    })
}
