use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A user account as returned by the API.
///
/// The password hash never leaves the database layer; this struct is the
/// full serializable surface of an account.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// The allow-listed profile fields a user may change about themselves.
///
/// This struct is the entire update surface: `id`, `username`, and `is_staff`
/// have no corresponding field here, so no payload can reach them through the
/// profile path. Unknown JSON fields (including `is_staff`) are dropped at
/// deserialization.
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}
