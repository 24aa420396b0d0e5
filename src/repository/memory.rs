//! In-process store implementing both repository traits.
//!
//! Mirrors the PostgreSQL adapter's semantics: soft-deleted rows are hidden,
//! usernames are unique among live users, a renter holds at most one bike, and
//! `swap_rental` is a compare-and-set. Used by the test suites.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{BikeRepository, RepositoryError, UserRepository};
use crate::models::{Bike, NewUser, Rental, User};

#[derive(Default)]
struct State {
    users: Vec<User>,
    bikes: Vec<Bike>,
    last_user_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a bike.
    pub async fn put_bike(&self, bike: Bike) {
        let mut state = self.state.lock().await;
        state.bikes.retain(|b| b.id != bike.id);
        state.bikes.push(bike);
        state.bikes.sort_by_key(|b| b.id);
    }

    /// Returns the stored bike, soft-deleted or not.
    pub async fn bike(&self, id: i64) -> Option<Bike> {
        let state = self.state.lock().await;
        state.bikes.iter().find(|b| b.id == id).cloned()
    }

    pub async fn soft_delete_user(&self, id: i64) {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.deleted_at = Some(Utc::now());
        }
    }

    pub async fn soft_delete_bike(&self, id: i64) {
        let mut state = self.state.lock().await;
        if let Some(bike) = state.bikes.iter_mut().find(|b| b.id == id) {
            bike.deleted_at = Some(Utc::now());
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.is_active() && u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.is_active() && u.id == id)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .filter(|u| u.is_active() && ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;
        if state
            .users
            .iter()
            .any(|u| u.is_active() && u.username == user.username)
        {
            return Err(RepositoryError::UniqueViolation(
                "users_username_live_key".to_string(),
            ));
        }

        state.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: state.last_user_id,
            username: user.username,
            password_hash: user.password_hash,
            name: user.name,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.users.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl BikeRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<Bike>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .bikes
            .iter()
            .filter(|b| b.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Bike>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .bikes
            .iter()
            .find(|b| b.deleted_at.is_none() && b.id == id)
            .cloned())
    }

    async fn count_by_renter(&self, user_id: i64) -> Result<i64, RepositoryError> {
        let state = self.state.lock().await;
        let count = state
            .bikes
            .iter()
            .filter(|b| b.deleted_at.is_none() && b.renter() == Some(user_id))
            .count();
        Ok(count as i64)
    }

    async fn swap_rental(
        &self,
        id: i64,
        expected: Rental,
        next: Rental,
    ) -> Result<Option<Bike>, RepositoryError> {
        let mut state = self.state.lock().await;

        if let Some(renter) = next.renter() {
            let holds_other = state
                .bikes
                .iter()
                .any(|b| b.id != id && b.deleted_at.is_none() && b.renter() == Some(renter));
            if holds_other {
                return Err(RepositoryError::UniqueViolation(
                    "bikes_one_per_renter".to_string(),
                ));
            }
        }

        let Some(bike) = state
            .bikes
            .iter_mut()
            .find(|b| b.deleted_at.is_none() && b.id == id && b.rental == expected)
        else {
            return Ok(None);
        };
        bike.rental = next;
        bike.updated_at = Utc::now();
        Ok(Some(bike.clone()))
    }
}
