use crate::{
    auth::{AuthResponse, LoginRequest, RegisterRequest, TokenService},
    error::AppError,
    request_id::RequestId,
    services::UserService,
};
use actix_web::{post, web, HttpResponse, Responder};
use validator::Validate;

/// Register a new user
///
/// Creates the account and returns an access token for it.
///
/// ## Responses:
/// - `201 Created`: `{"accessToken": "..."}`.
/// - `400 Bad Request`: malformed or invalid body, or the username is taken.
/// - `500 Internal Server Error`: storage or hashing failure.
#[post("/register")]
pub async fn register(
    users: web::Data<UserService>,
    tokens: web::Data<TokenService>,
    rid: RequestId,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let register_data = register_data.into_inner();
    register_data.validate().map_err(|e| {
        log::info!("[UserHandler.register] {} invalid body: {}", rid, e);
        AppError::from(e)
    })?;

    let user = users.register(&rid, register_data).await?;
    let access_token = tokens.generate(&user)?;

    Ok(HttpResponse::Created().json(AuthResponse { access_token }))
}

/// Login user
///
/// Checks the credentials and returns a fresh access token.
///
/// ## Responses:
/// - `200 OK`: `{"accessToken": "..."}`.
/// - `400 Bad Request`: malformed or invalid body.
/// - `404 Not Found`: unknown username or wrong password.
#[post("/login")]
pub async fn login(
    users: web::Data<UserService>,
    tokens: web::Data<TokenService>,
    rid: RequestId,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let login_data = login_data.into_inner();
    login_data.validate().map_err(|e| {
        log::info!("[UserHandler.login] {} invalid body: {}", rid, e);
        AppError::from(e)
    })?;

    let user = users.login(&rid, login_data).await?;
    let access_token = tokens.generate(&user)?;

    Ok(HttpResponse::Ok().json(AuthResponse { access_token }))
}
