use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use sqlx::FromRow;
use std::future::{ready, Ready};

use crate::error::AppError;

/// The identity resolved for the current request.
///
/// `ApiKeyAuth` is responsible for resolving the presented API key and
/// inserting this value into request extensions; handlers receive it through
/// the `FromRequest` impl below and pass it onward explicitly. Core
/// operations never read identity from anywhere else.
///
/// If the identity is not found in the extensions (e.g., if `ApiKeyAuth` did
/// not run on this route), the extractor returns `AppError::Unauthorized`.
#[derive(Debug, Clone, FromRow)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub is_staff: bool,
}

impl FromRequest for CurrentUser {
    type Error = ActixError; // AppError will be converted into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<CurrentUser>().cloned() {
            Some(user) => ready(Ok(user)),
            None => {
                // Reachable only when a route was registered outside the
                // authenticated scope; rejecting as unauthenticated is the
                // safe default.
                let err = AppError::Unauthorized(
                    "Identity not resolved for request. Ensure ApiKeyAuth is active.".to_string(),
                );
                ready(Err(err.into())) // Convert AppError to ActixError
            }
        }
    }
}
