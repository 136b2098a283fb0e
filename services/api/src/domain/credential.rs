//! Password hashing and bearer token material.

use anyhow::{Context as _, anyhow};
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngExt;
use sha2::{Digest, Sha256};

use moviego_domain::token::Scope;

use crate::domain::types::Token;
use crate::error::ApiError;

const TOKEN_BYTES: usize = 16;
const SALT_BYTES: usize = 16;

// Argon2id, 19 MiB, 2 passes, 1 lane.
const ARGON2_MEMORY_KIB: u32 = 19_456;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_LANES: u32 = 1;

fn argon2() -> anyhow::Result<Argon2<'static>> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_LANES, None)
        .map_err(|e| anyhow!("argon2 params: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string. CPU bound; see [`hash_password`].
pub fn hash_password_blocking(plaintext: &str) -> anyhow::Result<String> {
    let salt_bytes: [u8; SALT_BYTES] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!("encode salt: {e}"))?;
    let hash = argon2()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!("hash password: {e}"))?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the hash cannot be checked at all.
pub fn verify_password_blocking(plaintext: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("parse password hash: {e}"))?;
    match argon2()?.verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("verify password: {e}")),
    }
}

pub async fn hash_password(plaintext: String) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || hash_password_blocking(&plaintext))
        .await
        .context("join password hashing task")??;
    Ok(hash)
}

pub async fn verify_password(plaintext: String, hash: String) -> Result<bool, ApiError> {
    let matches = tokio::task::spawn_blocking(move || verify_password_blocking(&plaintext, &hash))
        .await
        .context("join password verification task")??;
    Ok(matches)
}

/// SHA-256 of the plaintext. Deterministic, so it doubles as the lookup key.
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Fresh token for `user_id`, valid for `ttl` from now.
pub fn generate_token(user_id: i64, ttl: Duration, scope: Scope) -> Token {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    let plaintext = URL_SAFE_NO_PAD.encode(bytes);
    Token {
        hash: hash_token(&plaintext),
        plaintext,
        user_id,
        expiry: Utc::now() + ttl,
        scope,
    }
}
