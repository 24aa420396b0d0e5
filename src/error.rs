//!
//! # Custom Error Handling
//!
//! This module defines `AppError`, the closed set of failures a request can end in.
//! Every variant carries a stable code prefix and projects onto exactly one HTTP
//! status, so handlers never have to pick a status themselves.
//!
//! `AppError` implements `actix_web::error::ResponseError`; the response body is the
//! error message as a single JSON string. Internal details travel in the variant for
//! logging but are never sent to the client.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;
use validator::ValidationErrors;

use crate::repository::RepositoryError;

/// Represents all possible errors that can occur within the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unexpected server-side failure (HTTP 500). The payload is for logs only.
    #[error("e5000 internal server error")]
    Internal(String),

    /// Missing or invalid bearer token (HTTP 401).
    #[error("e4010 unauthorized")]
    Unauthorized,

    #[error("e4000 cannot rent because the bike is rented")]
    BikeRented,

    /// The caller already holds a bike.
    #[error("e4001 cannot rent because you have already rented a bike")]
    AlreadyRenting,

    #[error("e4002 cannot return because the bike is available")]
    BikeAvailable,

    #[error("e4003 cannot return because the bike is not yours")]
    BikeNotYours,

    #[error("e4004 user already existed")]
    UserAlreadyExists,

    /// The request body could not be parsed.
    #[error("e4005 invalid body")]
    InvalidBody,

    /// The request body parsed but failed field validation.
    #[error("e4005 invalid body: {0}")]
    Validation(String),

    #[error("e4006 invalid bike id")]
    InvalidBikeId,

    #[error("e4040 bike not found")]
    BikeNotFound,

    /// Unknown username or wrong password. Both cases share this variant.
    #[error("e4041 username or password is wrong")]
    LoginNotFound,

    #[error("e4042 user does not exist or inactive")]
    UserNotFound,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BikeRented
            | AppError::AlreadyRenting
            | AppError::BikeAvailable
            | AppError::BikeNotYours
            | AppError::UserAlreadyExists
            | AppError::InvalidBody
            | AppError::Validation(_)
            | AppError::InvalidBikeId => StatusCode::BAD_REQUEST,
            AppError::BikeNotFound | AppError::LoginNotFound | AppError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_string())
    }
}

/// Repository failures reaching this point are unexpected; "no rows" never does,
/// since repositories report it as `Ok(None)`.
impl From<RepositoryError> for AppError {
    fn from(error: RepositoryError) -> AppError {
        AppError::Internal(error.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(format!("bcrypt: {}", error))
    }
}

/// Only token encoding reaches this; verification failures are `Unauthorized`.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Internal(format!("failed to generate token: {}", error))
    }
}

/// Raised when a job handed to the blocking thread pool panics or is cancelled.
impl From<actix_web::error::BlockingError> for AppError {
    fn from(error: actix_web::error::BlockingError) -> AppError {
        AppError::Internal(format!("blocking task failed: {}", error))
    }
}
