//! Token scopes and plaintext format.

use std::fmt;

use crate::validator::Validator;

/// Length of an encoded token plaintext (16 random bytes, base64url, no padding).
pub const TOKEN_PLAINTEXT_LEN: usize = 22;

/// What a token may be used for. Tokens never work outside their scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Activation,
    Authentication,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Authentication => "authentication",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn validate_token_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        plaintext.len() == TOKEN_PLAINTEXT_LEN,
        "token",
        "must be 22 bytes long",
    );
}
