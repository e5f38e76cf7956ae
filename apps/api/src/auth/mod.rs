//! Account service: password hashing, token issuance and the `AuthUser` extractor.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

pub mod extractor;
pub mod handlers;

pub use extractor::AuthUser;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 32;

/// The two kinds of account that can sign in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Student,
    Recruiter,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub kind: PrincipalKind,
    #[serde(default)]
    pub admin: bool,
    pub iat: usize,
    pub exp: usize,
}

/// Signs an HS256 token valid for `ttl_hours`.
pub fn sign_token(
    user_id: Uuid,
    kind: PrincipalKind,
    admin: bool,
    secret: &str,
    ttl_hours: i64,
) -> Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| anyhow!("token expiry overflow"))?;

    let claims = Claims {
        sub: user_id,
        kind,
        admin,
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verifies signature and expiry, returning the decoded claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("password hashing failed: {e}"))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// 404 when the resource is missing, 403 when it belongs to someone else.
pub fn ensure_owner(owner: Option<Uuid>, caller: Uuid, resource: &str) -> Result<(), AppError> {
    match owner {
        None => Err(AppError::NotFound(format!("{resource} not found"))),
        Some(owner) if owner != caller => Err(AppError::Forbidden),
        Some(_) => Ok(()),
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(format!("'{email}' is not a valid email address")),
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(format!(
            "username must be {MIN_USERNAME_LENGTH}-{MAX_USERNAME_LENGTH} characters"
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("username may only contain letters, digits, '_' and '-'".to_string());
    }
    Ok(())
}
