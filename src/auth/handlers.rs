use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, UserResponse},
        extractors::AuthUser,
    },
    error::AppError,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/logout", post(logout))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(p)| p).map_err(|e| {
        warn!(error = %e, "rejected request body");
        AppError::Validation(e.body_text())
    })
}

fn validate_register(p: &RegisterRequest) -> Result<(), AppError> {
    if p.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if !is_valid_email(&p.email) {
        return Err(AppError::Validation("invalid email".into()));
    }
    if p.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_login(p: &LoginRequest) -> Result<(), AppError> {
    if !is_valid_email(&p.email) {
        return Err(AppError::Validation("invalid email".into()));
    }
    if p.password.is_empty() {
        return Err(AppError::Validation("password is required".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let payload = body(payload)?;
    validate_register(&payload)?;

    let user = state
        .accounts
        .register(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let payload = body(payload)?;
    validate_login(&payload)?;

    let res = state.sessions.login(&payload.email, &payload.password).await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.accounts.get_by_id(user_id).await?))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<LogoutResponse>, AppError> {
    Ok(Json(state.sessions.logout(user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_req(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no-at.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn register_validation() {
        assert!(validate_register(&register_req("Ana", "a@x.com", "secret1")).is_ok());
        assert!(validate_register(&register_req("Ana", "a@x.com", "123456")).is_ok());
        assert!(validate_register(&register_req("Ana", "a@x.com", "12345")).is_err());
        assert!(validate_register(&register_req("  ", "a@x.com", "secret1")).is_err());
        assert!(validate_register(&register_req("Ana", "bogus", "secret1")).is_err());
    }

    #[test]
    fn login_validation() {
        let ok = LoginRequest {
            email: "a@x.com".into(),
            password: "x".into(),
        };
        let empty = LoginRequest {
            email: "a@x.com".into(),
            password: String::new(),
        };
        assert!(validate_login(&ok).is_ok());
        assert!(matches!(validate_login(&empty), Err(AppError::Validation(_))));
    }
}
