//! Persistence seams for users and bikes.
//!
//! Lookups return `Ok(None)` when no live row matches; soft-deleted rows are
//! invisible to every method. `RepositoryError` is reserved for genuine
//! failures.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Bike, NewUser, Rental, User};

pub use memory::MemoryStore;
pub use postgres::{PgBikeRepository, PgUserRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique index rejected the write. Carries the constraint name when known.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                return RepositoryError::UniqueViolation(
                    db_error.constraint().unwrap_or_default().to_string(),
                );
            }
        }
        RepositoryError::Database(error.to_string())
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    /// Fetches every live user whose id is in `ids`. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, RepositoryError>;

    /// Inserts a user. A taken username yields `RepositoryError::UniqueViolation`.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;
}

#[async_trait]
pub trait BikeRepository: Send + Sync {
    /// All live bikes ordered by id.
    async fn list(&self) -> Result<Vec<Bike>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Bike>, RepositoryError>;

    /// Number of live bikes currently rented by `user_id`.
    async fn count_by_renter(&self, user_id: i64) -> Result<i64, RepositoryError>;

    /// Moves bike `id` from `expected` to `next` in one conditional write.
    ///
    /// Returns `Ok(None)` when the stored state no longer equals `expected`,
    /// which means a concurrent request got there first. A renter that would
    /// end up holding two bikes yields `RepositoryError::UniqueViolation`.
    async fn swap_rental(
        &self,
        id: i64,
        expected: Rental,
        next: Rental,
    ) -> Result<Option<Bike>, RepositoryError>;
}
