use crate::error::AppError;
use actix_web::web;
use bcrypt::{hash, verify};

/// Hashes `password` with bcrypt on the blocking thread pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    web::block(move || hash(password, cost))
        .await?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks `password` against a stored bcrypt hash on the blocking thread pool.
///
/// A malformed stored hash is an error rather than a mismatch.
pub async fn verify_password(password: String, hashed_password: String) -> Result<bool, AppError> {
    web::block(move || verify(password, &hashed_password))
        .await?
        .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
}
