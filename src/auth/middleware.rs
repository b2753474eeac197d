use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;

use crate::auth::extractors::Authenticated;
use crate::auth::token::verify_token;
use crate::error::AppError;
use crate::models::User;

/// Routes reachable without a bearer token: health check, signup, login, and
/// the public avatar fetch.
fn is_public(req: &ServiceRequest) -> bool {
    let path = req.path();
    let method = req.method();
    if *method == Method::GET {
        return path == "/health" || (path.starts_with("/users/") && path.ends_with("/avatar"));
    }
    if *method == Method::POST {
        return path == "/users" || path == "/users/login";
    }
    false
}

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    // The session lookup awaits the database, so the inner service is held
    // behind an Rc and cloned into the response future.
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        if is_public(&req) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            // Every failure mode — missing header, bad token, no matching
            // session, even a database hiccup — collapses into the same 401.
            let session = authenticate(&req)
                .await
                .map_err(|_| Error::from(AppError::Unauthorized("Please authenticate.".into())))?;
            req.extensions_mut().insert(session);
            service.call(req).await
        })
    }
}

/// Resolves the bearer token on `req` to an active session: the token must
/// verify, and the user it names must still list that exact token.
async fn authenticate(req: &ServiceRequest) -> Result<Authenticated, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let claims = verify_token(token)?;

    let pool = req
        .app_data::<web::Data<PgPool>>()
        .ok_or_else(|| AppError::InternalServerError("Database pool not configured".into()))?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, age, email, password, tokens, avatar, created_at, updated_at \
         FROM users WHERE id = $1 AND $2 = ANY(tokens)",
    )
    .bind(claims.sub)
    .bind(token)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::Unauthorized("Please authenticate.".into()))?;

    Ok(Authenticated {
        user,
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn public(req: ServiceRequest) -> bool {
        is_public(&req)
    }

    #[test]
    fn test_public_route_table() {
        assert!(public(
            TestRequest::get().uri("/health").to_srv_request()
        ));
        assert!(public(
            TestRequest::post().uri("/users").to_srv_request()
        ));
        assert!(public(
            TestRequest::post()
                .uri("/users/login")
                .to_srv_request()
        ));
        assert!(public(
            TestRequest::get()
                .uri("/users/1b4e28ba-2fa1-11d2-883f-0016d3cca427/avatar")
                .to_srv_request()
        ));

        // Everything else requires a session
        assert!(!public(
            TestRequest::get().uri("/users/me").to_srv_request()
        ));
        assert!(!public(
            TestRequest::post()
                .uri("/users/me/avatar")
                .to_srv_request()
        ));
        assert!(!public(
            TestRequest::post()
                .uri("/users/logout")
                .to_srv_request()
        ));
        assert!(!public(
            TestRequest::get().uri("/tasks").to_srv_request()
        ));
    }
}
