use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Input structure for creating or updating a task.
/// Contains validation rules for its fields.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Whether the task is done. Defaults to false when omitted.
    #[serde(default)]
    pub completed: bool,

    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: i64,
    /// The title of the task.
    pub title: String,
    /// Whether the task is done.
    pub completed: bool,
    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
    /// Timestamp of when the task was created. System-assigned, immutable.
    pub created_at: DateTime<Utc>,
    /// Identifier of the user who owns the task.
    pub user_id: i32,
}

/// Represents query parameters for filtering tasks when listing them.
/// Listing is always scoped to the authenticated user before these apply.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Filter tasks by completion state.
    pub completed: Option<bool>,
    /// Search term to filter tasks by title (case-insensitive).
    pub search: Option<String>,
}
