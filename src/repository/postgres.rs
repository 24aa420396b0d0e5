use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::{BikeRepository, RepositoryError, UserRepository};
use crate::models::{Bike, BikeStatus, NewUser, Rental, User};

const USER_COLUMNS: &str = "id, username, password_hash, name, created_at, updated_at, deleted_at";
const BIKE_COLUMNS: &str =
    "id, name, lat, long, status, user_id, created_at, updated_at, deleted_at";

/// PostgreSQL implementation of `UserRepository`.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND deleted_at IS NULL"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) AND deleted_at IS NULL ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, name) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}

/// Raw `bikes` row; turned into a `Bike` only if its rental columns agree.
#[derive(Debug, FromRow)]
struct BikeRow {
    id: i64,
    name: String,
    lat: Decimal,
    long: Decimal,
    status: BikeStatus,
    user_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<BikeRow> for Bike {
    type Error = RepositoryError;

    fn try_from(row: BikeRow) -> Result<Self, Self::Error> {
        let rental = Rental::from_parts(row.status, row.user_id)
            .map_err(|e| RepositoryError::Database(format!("bike {}: {}", row.id, e)))?;
        Ok(Bike {
            id: row.id,
            name: row.name,
            lat: row.lat,
            long: row.long,
            rental,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// PostgreSQL implementation of `BikeRepository`.
#[derive(Clone)]
pub struct PgBikeRepository {
    pool: PgPool,
}

impl PgBikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BikeRepository for PgBikeRepository {
    async fn list(&self) -> Result<Vec<Bike>, RepositoryError> {
        let rows = sqlx::query_as::<_, BikeRow>(&format!(
            "SELECT {BIKE_COLUMNS} FROM bikes WHERE deleted_at IS NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Bike::try_from).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Bike>, RepositoryError> {
        let row = sqlx::query_as::<_, BikeRow>(&format!(
            "SELECT {BIKE_COLUMNS} FROM bikes WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Bike::try_from).transpose()
    }

    async fn count_by_renter(&self, user_id: i64) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bikes WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn swap_rental(
        &self,
        id: i64,
        expected: Rental,
        next: Rental,
    ) -> Result<Option<Bike>, RepositoryError> {
        // The WHERE clause re-checks the state the caller validated, so two
        // racing requests cannot both win.
        let row = sqlx::query_as::<_, BikeRow>(&format!(
            "UPDATE bikes SET status = $2, user_id = $3, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
               AND status = $4 AND user_id IS NOT DISTINCT FROM $5 \
             RETURNING {BIKE_COLUMNS}"
        ))
        .bind(id)
        .bind(next.status())
        .bind(next.renter())
        .bind(expected.status())
        .bind(expected.renter())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Bike::try_from).transpose()
    }
}
