use time::OffsetDateTime;

/// User profile record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,                    // assigned by the store
    pub name: String,
    pub email: String,              // unique, case-sensitive
    pub created_at: OffsetDateTime,
}

/// Password and session record, one per user. Never leaves the crate.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: i64,
    pub user_id: i64,
    pub password_hash: String,      // Argon2 PHC string
    pub token: String,              // empty when logged out
    pub login_at: Option<OffsetDateTime>,
    pub logout_at: Option<OffsetDateTime>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

impl Credential {
    pub fn new(user_id: i64, password_hash: String) -> Self {
        Self {
            id: 0,
            user_id,
            password_hash,
            token: String::new(),
            login_at: None,
            logout_at: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        !self.token.is_empty()
    }
}
