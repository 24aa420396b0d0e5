use std::sync::Arc;

use crate::auth::{hash_password, verify_password, LoginRequest, RegisterRequest};
use crate::error::AppError;
use crate::models::{NewUser, UserView};
use crate::repository::{RepositoryError, UserRepository};
use crate::request_id::RequestId;

/// Account registration and credential checks.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    /// Creates an account and returns its public view.
    ///
    /// Fails with `UserAlreadyExists` when a live account already uses the
    /// username, including when a concurrent registration wins the insert.
    pub async fn register(
        &self,
        rid: &RequestId,
        request: RegisterRequest,
    ) -> Result<UserView, AppError> {
        log::info!("[UserService.register] {} starting", rid);
        let existing = self
            .users
            .find_by_username(&request.username)
            .await
            .map_err(|e| internal(rid, "register", "fetch user by username failed", e))?;
        if existing.is_some() {
            log::info!("[UserService.register] {} user already existed", rid);
            return Err(AppError::UserAlreadyExists);
        }

        let password_hash = hash_password(request.password, self.bcrypt_cost)
            .await
            .map_err(|e| {
                log::error!("[UserService.register] {} hash password failed: {}", rid, detail(&e));
                e
            })?;

        let new_user = NewUser {
            username: request.username,
            password_hash,
            name: request.name,
        };
        let user = match self.users.create(new_user).await {
            Ok(user) => user,
            Err(RepositoryError::UniqueViolation(constraint)) => {
                log::warn!(
                    "[UserService.register] {} lost insert race on {}",
                    rid,
                    constraint
                );
                return Err(AppError::UserAlreadyExists);
            }
            Err(e) => return Err(internal(rid, "register", "create user failed", e)),
        };

        log::info!("[UserService.register] {} user {} registered", rid, user.id);
        Ok(UserView::from(&user))
    }

    /// Checks credentials. An unknown username and a wrong password produce
    /// the same `LoginNotFound` error.
    pub async fn login(&self, rid: &RequestId, request: LoginRequest) -> Result<UserView, AppError> {
        log::info!("[UserService.login] {} starting", rid);
        let Some(user) = self
            .users
            .find_by_username(&request.username)
            .await
            .map_err(|e| internal(rid, "login", "fetch user by username failed", e))?
        else {
            log::info!("[UserService.login] {} user not found", rid);
            return Err(AppError::LoginNotFound);
        };

        let matches = verify_password(request.password, user.password_hash.clone())
            .await
            .map_err(|e| {
                log::error!("[UserService.login] {} verify password failed: {}", rid, detail(&e));
                e
            })?;
        if !matches {
            log::info!("[UserService.login] {} user {} password does not match", rid, user.id);
            return Err(AppError::LoginNotFound);
        }

        log::info!("[UserService.login] {} user {} login success", rid, user.id);
        Ok(UserView::from(&user))
    }
}

fn internal(rid: &RequestId, op: &str, what: &str, error: RepositoryError) -> AppError {
    log::error!("[UserService.{}] {} {}: {}", op, rid, what, error);
    AppError::from(error)
}

fn detail(error: &AppError) -> String {
    match error {
        AppError::Internal(detail) => detail.clone(),
        other => other.to_string(),
    }
}
