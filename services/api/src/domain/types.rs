use chrono::{DateTime, Utc};

use moviego_domain::token::Scope;

/// An issued token. `plaintext` is only ever held in memory; stores keep `hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub plaintext: String,
    pub hash: Vec<u8>,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: Scope,
}
