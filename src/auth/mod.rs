pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Payload for `POST /users/login`.
///
/// Only presence is checked here; credential mismatches are reported as
/// "username or password is wrong" by the use-case.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Payload for `POST /users/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Must be between 3 and 32 characters: alphanumeric, underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// 6 to 72 characters, and at most 72 bytes: bcrypt ignores anything past that.
    #[validate(length(min = 6, max = 72), custom = "validate_bcrypt_len")]
    pub password: String,
    /// Display name shown next to rented bikes.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

const BCRYPT_MAX_BYTES: usize = 72;

fn validate_bcrypt_len(password: &str) -> Result<(), ValidationError> {
    if password.len() > BCRYPT_MAX_BYTES {
        let mut error = ValidationError::new("bcrypt_max_bytes");
        error.message = Some("Password must be at most 72 bytes".into());
        return Err(error);
    }
    Ok(())
}

/// Body returned by register and login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_login_request_validation() {
        let valid_login = LoginRequest {
            username: "rider".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid_login.validate().is_ok());

        let empty_password = LoginRequest {
            username: "rider".to_string(),
            password: "".to_string(),
        };
        assert!(empty_password.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let valid_register = RegisterRequest {
            username: "test_user-123".to_string(),
            password: "password123".to_string(),
            name: "Test User".to_string(),
        };
        assert!(valid_register.validate().is_ok());

        let invalid_username_register = RegisterRequest {
            username: "test user!".to_string(),
            password: "password123".to_string(),
            name: "Test User".to_string(),
        };
        assert!(invalid_username_register.validate().is_err());

        let short_username_register = RegisterRequest {
            username: "tu".to_string(),
            password: "password123".to_string(),
            name: "Test User".to_string(),
        };
        assert!(short_username_register.validate().is_err());

        let long_password_register = RegisterRequest {
            username: "rider".to_string(),
            password: "p".repeat(73),
            name: "Test User".to_string(),
        };
        assert!(long_password_register.validate().is_err());

        // 40 characters but 80 bytes
        let multibyte_password_register = RegisterRequest {
            username: "rider".to_string(),
            password: "é".repeat(40),
            name: "Test User".to_string(),
        };
        assert!(multibyte_password_register.validate().is_err());

        let exactly_72_bytes_register = RegisterRequest {
            username: "rider".to_string(),
            password: "é".repeat(36),
            name: "Test User".to_string(),
        };
        assert!(exactly_72_bytes_register.validate().is_ok());

        let empty_name_register = RegisterRequest {
            username: "rider".to_string(),
            password: "password123".to_string(),
            name: "".to_string(),
        };
        assert!(empty_name_register.validate().is_err());
    }

    #[test]
    fn test_auth_response_uses_access_token_key() {
        let json = serde_json::to_value(AuthResponse {
            access_token: "abc".into(),
        })
        .unwrap();
        assert_eq!(json["accessToken"], "abc");
    }
}
