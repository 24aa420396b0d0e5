use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{Compress, Logger},
    App, HttpServer,
};
use sqlx::postgres::PgPoolOptions;

use shared_bike::auth::TokenService;
use shared_bike::config::Config;
use shared_bike::repository::{PgBikeRepository, PgUserRepository};
use shared_bike::request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
use shared_bike::AppState;

const ACCESS_LOG_FORMAT: &str = r#"%a "%r" %s %b %Dms rid=%{x-request-id}o"#;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            log::error!("failed to connect to database: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        log::error!("failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let state = AppState::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgBikeRepository::new(pool)),
        TokenService::new(&config.jwt_secret, config.token_ttl()),
        config.bcrypt_cost,
    );

    log::info!("starting shared-bike server at {}", config.public_url());

    let allowed_origin = config.allowed_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST", "PATCH", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::HeaderName::from_static(REQUEST_ID_HEADER),
            ])
            .expose_headers(vec![header::HeaderName::from_static(REQUEST_ID_HEADER)])
            .supports_credentials()
            .max_age(3600);

        // Last wrap runs first: CORS, then the access log, which reads the
        // id header set further in.
        App::new()
            .wrap(Compress::default())
            .wrap(RequestIdMiddleware)
            .wrap(Logger::new(ACCESS_LOG_FORMAT))
            .wrap(cors)
            .configure(|cfg| state.configure(cfg))
    })
    .shutdown_timeout(config.shutdown_timeout_secs)
    .bind(config.server_addr())?
    .run()
    .await
}
