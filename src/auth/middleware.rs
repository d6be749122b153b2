use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;
use std::rc::Rc;

use crate::auth::keys;
use crate::error::AppError;

/// Middleware that resolves the `Authorization: Bearer <key>` header into a
/// [`CurrentUser`](crate::auth::CurrentUser) through the API key registry.
///
/// Requests with no presented key, or a key the registry does not recognize,
/// are rejected with 401 before any handler runs. The presented secret is
/// never logged. The login and registration paths are exempt: they are how a
/// user obtains a key in the first place.
pub struct ApiKeyAuth;

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ApiKeyAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthService {
            service: Rc::new(service),
        }))
    }
}

pub struct ApiKeyAuthService<S> {
    // Rc because the registry lookup is async and the future must own a
    // handle to the wrapped service.
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            // Skip authentication for health check and key-acquisition endpoints
            let exempt = {
                let path = req.path();
                path == "/health"
                    || path.starts_with("/api/auth/login")
                    || path.starts_with("/api/auth/register")
            };
            if exempt {
                return service.call(req).await;
            }

            let presented = req
                .headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_owned);

            let presented = match presented {
                Some(presented) => presented,
                None => {
                    return Err(AppError::Unauthorized("Missing API key".into()).into());
                }
            };

            let pool = req
                .app_data::<web::Data<PgPool>>()
                .cloned()
                .ok_or_else(|| {
                    AppError::InternalServerError("Database pool not configured".into())
                })?;

            match keys::lookup(pool.get_ref(), &presented).await? {
                Some(user) => {
                    req.extensions_mut().insert(user);
                    service.call(req).await
                }
                None => Err(AppError::Unauthorized("Invalid API key".into()).into()),
            }
        })
    }
}
