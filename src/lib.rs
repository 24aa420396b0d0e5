#![doc = "The `shared_bike` library crate."]
#![doc = ""]
#![doc = "Domain models, repositories, use-cases, authentication and HTTP routing for the"]
#![doc = "shared bike rental backend. The binary (`main.rs`) loads configuration, connects"]
#![doc = "to PostgreSQL and serves the app built from [`AppState`]."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod request_id;
pub mod routes;
pub mod services;

use std::sync::Arc;

use actix_web::web;

use crate::auth::TokenService;
use crate::repository::{BikeRepository, UserRepository};
use crate::services::{BikeService, UserService};

/// Shared handles registered as app data on every worker.
#[derive(Clone)]
pub struct AppState {
    pub users: web::Data<UserService>,
    pub bikes: web::Data<BikeService>,
    pub tokens: web::Data<TokenService>,
}

impl AppState {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        bike_repo: Arc<dyn BikeRepository>,
        tokens: TokenService,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users: web::Data::new(UserService::new(user_repo.clone(), bcrypt_cost)),
            bikes: web::Data::new(BikeService::new(bike_repo, user_repo)),
            tokens: web::Data::new(tokens),
        }
    }

    /// Registers app data, `/health` and the `/api/v1` routes.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.users.clone())
            .app_data(self.bikes.clone())
            .app_data(self.tokens.clone())
            .service(routes::health::health);
        routes::config(cfg, &self.tokens);
    }
}
