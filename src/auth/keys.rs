//! API key registry.
//!
//! Each user holds at most one active key, a random UUID v4 generated by the
//! server and never chosen by the client. Keys are stored raw and resolved by
//! direct equality: the key value itself is the high-entropy secret, so the
//! `api_keys` table is the sensitive surface. One-key-per-user is enforced by
//! the `user_id` primary key; a UNIQUE constraint on `key` guards the
//! negligible collision case at the storage layer.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::error::AppError;

/// Returns the user's active API key, creating one if none exists yet.
///
/// Issuance is a single `INSERT .. ON CONFLICT DO NOTHING`, so two concurrent
/// first logins for the same user cannot both insert; the loser of the race
/// reads back the surviving row. Calling this repeatedly without rotation
/// returns the same key every time.
pub async fn issue_or_fetch(pool: &PgPool, user_id: i32) -> Result<Uuid, AppError> {
    let candidate = Uuid::new_v4();

    let inserted = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO api_keys (user_id, key) VALUES ($1, $2)
         ON CONFLICT (user_id) DO NOTHING
         RETURNING key",
    )
    .bind(user_id)
    .bind(candidate)
    .fetch_optional(pool)
    .await?;

    if let Some(key) = inserted {
        return Ok(key);
    }

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT key FROM api_keys WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    // Only reachable if the row vanished between the two statements,
    // i.e. the user was deleted concurrently.
    existing.ok_or_else(|| AppError::InternalServerError("API key issuance failed".into()))
}

/// Replaces the user's API key with a fresh random value and returns it.
///
/// The old value becomes permanently invalid. The replacement is a single
/// atomic upsert: a concurrent lookup resolves either the old key or the new
/// one, never a torn state. Rotation shares get-or-create semantics with
/// [`issue_or_fetch`]: a user without a prior key ends up with a new one
/// rather than an error.
pub async fn rotate(pool: &PgPool, user_id: i32) -> Result<Uuid, AppError> {
    let replacement = Uuid::new_v4();

    let key = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO api_keys (user_id, key) VALUES ($1, $2)
         ON CONFLICT (user_id) DO UPDATE SET key = EXCLUDED.key, created_at = now()
         RETURNING key",
    )
    .bind(user_id)
    .bind(replacement)
    .fetch_one(pool)
    .await?;

    Ok(key)
}

/// Resolves a presented key to its owning user.
///
/// An unknown key is `Ok(None)`, not an error; the caller decides how to
/// reject. Input that does not even parse as a UUID resolves to `None`
/// without touching storage.
pub async fn lookup(pool: &PgPool, presented: &str) -> Result<Option<CurrentUser>, AppError> {
    let key = match Uuid::parse_str(presented) {
        Ok(key) => key,
        Err(_) => return Ok(None),
    };

    let user = sqlx::query_as::<_, CurrentUser>(
        "SELECT u.id, u.username, u.is_staff
         FROM api_keys k
         JOIN users u ON u.id = k.user_id
         WHERE k.key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}
