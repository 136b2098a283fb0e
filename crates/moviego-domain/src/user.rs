//! User accounts and the identity attached to each request.

use chrono::{DateTime, Utc};

use crate::validator::{EMAIL_RX, Validator, matches};

pub const MAX_NAME_BYTES: usize = 500;
pub const MIN_PASSWORD_BYTES: usize = 8;
pub const MAX_PASSWORD_BYTES: usize = 72;

/// A stored user. Only the salted password hash is ever kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub activated: bool,
    pub version: i32,
}

/// A user about to be inserted. New accounts start inactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub activated: bool,
}

/// Who is making the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(User),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(matches(email, &EMAIL_RX), "email", "must be a valid email address");
}

pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(
        password.len() >= MIN_PASSWORD_BYTES,
        "password",
        "must be at least 8 bytes long",
    );
    v.check(
        password.len() <= MAX_PASSWORD_BYTES,
        "password",
        "must not be more than 72 bytes long",
    );
}

pub fn validate_name(v: &mut Validator, name: &str) {
    v.check(!name.is_empty(), "name", "must be provided");
    v.check(
        name.len() <= MAX_NAME_BYTES,
        "name",
        "must not be more than 500 bytes long",
    );
}
