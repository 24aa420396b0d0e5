use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::RentalRequest,
    request_id::RequestId,
    services::BikeService,
};
use actix_web::{get, patch, web, HttpResponse, Responder};

/// Lists every bike with its rental state.
///
/// ## Responses:
/// - `200 OK`: JSON array of bikes; rented ones carry the renter's name and username.
/// - `401 Unauthorized`: missing or invalid bearer token.
#[get("")]
pub async fn list_bikes(
    bikes: web::Data<BikeService>,
    rid: RequestId,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let views = bikes.list_bikes(&rid).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// Rents bike `{id}` to the caller.
///
/// ## Responses:
/// - `200 OK`: the rented bike, with the caller as renter.
/// - `400 Bad Request`: non-numeric id, the caller already rents a bike, or the bike is taken.
/// - `404 Not Found`: the bike or the caller's account does not exist.
#[patch("/{id}/rent")]
pub async fn rent_bike(
    bikes: web::Data<BikeService>,
    rid: RequestId,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let request = RentalRequest {
        bike_id: path.into_inner(),
        user_id: user.user_id(),
    };
    let view = bikes.rent(&rid, request).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Returns bike `{id}` on behalf of the caller.
///
/// ## Responses:
/// - `200 OK`: the bike, now available.
/// - `400 Bad Request`: non-numeric id, the bike is not rented, or someone else rents it.
/// - `404 Not Found`: the bike does not exist.
#[patch("/{id}/return")]
pub async fn return_bike(
    bikes: web::Data<BikeService>,
    rid: RequestId,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let request = RentalRequest {
        bike_id: path.into_inner(),
        user_id: user.user_id(),
    };
    let view = bikes.return_bike(&rid, request).await?;
    Ok(HttpResponse::Ok().json(view))
}
