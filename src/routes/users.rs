use crate::{
    auth::{require_staff, CurrentUser},
    error::AppError,
    models::{ProfileUpdate, Task, User},
};
use actix_web::{get, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_staff, created_at";

/// Returns the authenticated user's own profile.
///
/// ## Responses:
/// - `200 OK`: Returns the `User` object as JSON.
/// - `401 Unauthorized`: If the request lacks a valid API key.
#[get("/me")]
pub async fn get_profile(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    let profile = sqlx::query_as::<_, User>(&sql)
        .bind(user.id)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// Updates the authenticated user's own profile.
///
/// Only the allow-listed fields of `ProfileUpdate` (email, display names) are
/// written; `id`, `username`, and `is_staff` are immutable through this path,
/// whatever the payload contains.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `User` object as JSON.
/// - `401 Unauthorized`: If the request lacks a valid API key.
/// - `422 Unprocessable Entity`: If input validation on `ProfileUpdate` fails.
#[put("/me")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    profile_data: web::Json<ProfileUpdate>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    profile_data.validate()?;

    let sql = format!(
        "UPDATE users SET email = $1, first_name = $2, last_name = $3
         WHERE id = $4
         RETURNING {}",
        USER_COLUMNS
    );
    let profile = sqlx::query_as::<_, User>(&sql)
        .bind(&profile_data.email)
        .bind(&profile_data.first_name)
        .bind(&profile_data.last_name)
        .bind(user.id)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// Lists all user accounts. Staff only.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `User` objects.
/// - `401 Unauthorized`: If the request lacks a valid API key.
/// - `403 Forbidden`: If the requester is not staff.
#[get("")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    require_staff(&user)?;

    let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
    let users = sqlx::query_as::<_, User>(&sql)
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(users))
}

/// Lists any user's tasks by user id. Staff only.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of the target user's `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid API key.
/// - `403 Forbidden`: If the requester is not staff.
/// - `404 Not Found`: If the target user does not exist.
#[get("/{id}/tasks")]
pub async fn list_user_tasks(
    pool: web::Data<PgPool>,
    target_id: web::Path<i32>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    require_staff(&user)?;

    let target_id = target_id.into_inner();

    let target = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1")
        .bind(target_id)
        .fetch_optional(&**pool)
        .await?;

    if target.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    let tasks = sqlx::query_as::<_, Task>(
        "SELECT id, title, completed, due_date, created_at, user_id
         FROM tasks WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(target_id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(tasks))
}
