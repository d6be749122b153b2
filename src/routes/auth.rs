use crate::{
    auth::{hash_password, keys, verify_password, AuthResponse, CurrentUser, LoginRequest, RegisterRequest},
    error::AppError,
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Register a new user
///
/// Creates a new (non-staff) user account, issues its API key, and returns it.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    register_data.validate()?;

    // Check if the username is already taken
    let existing_user =
        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE username = $1 OR email = $2")
            .bind(&register_data.username)
            .bind(&register_data.email)
            .fetch_optional(&**pool)
            .await?;

    if existing_user.is_some() {
        return Err(AppError::BadRequest("Username or email already registered".into()));
    }

    // Hash password
    let password_hash = hash_password(&register_data.password)?;

    // Insert new user; the staff flag has no input path here and stays false.
    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&register_data.username)
    .bind(&register_data.email)
    .bind(password_hash)
    .fetch_one(&**pool)
    .await?;

    // Issue the account's API key
    let api_key = keys::issue_or_fetch(&pool, user_id).await?;

    Ok(HttpResponse::Created().json(AuthResponse {
        api_key: api_key.to_string(),
        user_id,
    }))
}

/// Login user
///
/// Validates a username/password pair and returns the account's API key,
/// creating one lazily on the first successful login. This is the only
/// authenticated-surface entry point that does not itself require a key.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    login_data.validate()?;

    // Get user from database
    let user = sqlx::query_as::<_, (i32, String)>(
        "SELECT id, password_hash FROM users WHERE username = $1",
    )
    .bind(&login_data.username)
    .fetch_optional(&**pool)
    .await?;

    // Absent account and wrong password are indistinguishable to the caller.
    match user {
        Some((user_id, password_hash)) => {
            if verify_password(&login_data.password, &password_hash)? {
                let api_key = keys::issue_or_fetch(&pool, user_id).await?;
                Ok(HttpResponse::Ok().json(AuthResponse {
                    api_key: api_key.to_string(),
                    user_id,
                }))
            } else {
                Err(AppError::Unauthorized("Invalid credentials".into()))
            }
        }
        None => Err(AppError::Unauthorized("Invalid credentials".into())),
    }
}

/// Rotate the caller's API key
///
/// Generates a fresh key and returns it; the previous key stops resolving
/// immediately. Works even if the account had no key yet (get-or-create,
/// same as first issuance).
#[post("/rotate")]
pub async fn rotate_key(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let api_key = keys::rotate(&pool, user.id).await?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        api_key: api_key.to_string(),
        user_id: user.id,
    }))
}
