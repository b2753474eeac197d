use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Represents a user account as stored in the database.
///
/// The serialized (outward-facing) representation omits `password`, `tokens`,
/// and `avatar`; those fields never leave the server in a JSON body.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique identifier for the user (UUID v4).
    pub id: Uuid,
    /// Display name, trimmed on input.
    pub name: String,
    /// Age in years, zero when not provided.
    pub age: i32,
    /// Unique, lower-cased email address.
    pub email: String,
    /// bcrypt hash of the password. Never the plaintext.
    #[serde(skip)]
    pub password: String,
    /// Active session tokens, oldest first.
    #[serde(skip)]
    pub tokens: Vec<String>,
    /// 250x250 PNG avatar bytes, if one has been uploaded.
    #[serde(skip)]
    pub avatar: Option<Vec<u8>>,
    /// Timestamp of account creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last modification.
    pub updated_at: DateTime<Utc>,
}

/// Input structure for signing up a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(range(min = 0, message = "Age must be positive"))]
    pub age: i32,

    #[validate(email(message = "Email is invalid!"))]
    pub email: String,

    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "reject_literal_password"
    )]
    pub password: String,
}

impl UserInput {
    /// Trims whitespace from all string fields and lower-cases the email,
    /// mirroring what the database expects. Call before `validate`.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.password = self.password.trim().to_string();
    }
}

/// Profile update payload. `deny_unknown_fields` rejects any key outside
/// {name, age, email, password} at the deserialization boundary, so a stray
/// key fails the request before a handler ever runs.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,

    #[validate(range(min = 0, message = "Age must be positive"))]
    pub age: Option<i32>,

    #[validate(email(message = "Email is invalid!"))]
    pub email: Option<String>,

    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "reject_literal_password"
    )]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn normalize(&mut self) {
        if let Some(name) = &self.name {
            self.name = Some(name.trim().to_string());
        }
        if let Some(email) = &self.email {
            self.email = Some(email.trim().to_lowercase());
        }
        if let Some(password) = &self.password {
            self.password = Some(password.trim().to_string());
        }
    }
}

/// Passwords may not contain the word "password", in any casing.
fn reject_literal_password(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        return Err(ValidationError::new("password_contains_password"));
    }
    Ok(())
}
