pub mod bikes;
pub mod health;
pub mod users;

use actix_web::{web, HttpMessage, HttpRequest};

use crate::auth::{AuthMiddleware, TokenService};
use crate::error::AppError;
use crate::request_id::RequestId;

/// Mounts the versioned API. Everything under `/bikes` requires a bearer token.
pub fn config(cfg: &mut web::ServiceConfig, tokens: &TokenService) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config())
            .app_data(path_config())
            .service(
                web::scope("/users")
                    .service(users::register)
                    .service(users::login),
            )
            .service(
                web::scope("/bikes")
                    .wrap(AuthMiddleware::new(tokens.clone()))
                    .service(bikes::list_bikes)
                    .service(bikes::rent_bike)
                    .service(bikes::return_bike),
            ),
    );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        log::info!("[Handler] {} invalid body: {}", request_id(req), err);
        AppError::InvalidBody.into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, req| {
        log::info!(
            "[Handler] {} invalid bike id {}: {}",
            request_id(req),
            req.match_info().get("id").unwrap_or_default(),
            err
        );
        AppError::InvalidBikeId.into()
    })
}

fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_default()
}
