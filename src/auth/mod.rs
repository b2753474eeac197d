pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};

// Re-export necessary items
pub use extractors::Authenticated;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

use crate::models::User;

/// Represents the payload for a user login request.
///
/// Credentials are checked as a pair and any mismatch produces the same
/// "Unable to login!" response, so there is no field-level validation here.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// User's email address.
    pub email: String,
    /// User's password.
    pub password: String,
}

/// Response structure after successful signup or login.
/// Contains the serialized user and the newly minted session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The authenticated user, with credentials and avatar omitted.
    pub user: User,
    /// The JWT session token; also appended to the user's token list.
    pub token: String,
}
