//! Credential hashing with Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so the
//! algorithm parameters and salt travel with the hash and verification needs
//! nothing else.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{AppError, AuthError};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Password hash error: {}", e)))
}

/// Fails with `InvalidCredentials` when the password does not match.
/// A stored value that is not a parseable hash is an internal error.
pub fn verify_password(hash: &str, password: &str) -> Result<(), AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::InternalError(format!("Stored password hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::AuthError(AuthError::InvalidCredentials))
}

/// Runs `hash_password` on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// Runs `verify_password` on the blocking pool.
pub async fn verify_password_blocking(hash: String, password: String) -> Result<(), AppError> {
    tokio::task::spawn_blocking(move || verify_password(&hash, &password)).await?
}
