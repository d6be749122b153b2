pub mod extractors;
pub mod gate;
pub mod keys;
pub mod middleware;
pub mod password;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use extractors::CurrentUser;
pub use gate::require_staff;
pub use middleware::ApiKeyAuth;
pub use password::{hash_password, verify_password};

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username of the account to authenticate.
    #[validate(length(min = 1))]
    pub username: String,
    /// User's password.
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username for the new account.
    /// Must be between 3 and 32 characters, alphanumeric, and can include underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Email address for the new account.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// Password for the new account.
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Response structure after successful authentication (login, registration, or rotation).
/// Contains the bearer API key and the ID of the authenticated user.
///
/// Accounts created through registration are never staff; the privileged flag
/// has no input path on this surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The opaque API key to present as `Authorization: Bearer <key>`.
    pub api_key: String,
    /// The unique identifier of the authenticated user.
    pub user_id: i32,
}
