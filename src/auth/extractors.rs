use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::User;

/// The authenticated identity for the current request: the resolved user row
/// plus the exact token that was presented (logout removes precisely that
/// token from the session list).
///
/// `AuthMiddleware` inserts this into request extensions after verifying the
/// bearer token; the extractor hands it to handlers. If it is missing the
/// request never passed authentication, and the extractor responds 401.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub token: String,
}

impl FromRequest for Authenticated {
    type Error = ActixError; // AppError is converted into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Authenticated>().cloned() {
            Some(session) => ready(Ok(session)),
            None => {
                let err = AppError::Unauthorized("Please authenticate.".to_string());
                ready(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_session() -> Authenticated {
        Authenticated {
            user: User {
                id: Uuid::new_v4(),
                name: "mihir".to_string(),
                age: 0,
                email: "mihir@example.com".to_string(),
                password: "$2b$12$hash".to_string(),
                tokens: vec!["token-one".to_string()],
                avatar: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            token: "token-one".to_string(),
        }
    }

    #[actix_rt::test]
    async fn test_authenticated_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        let session = sample_session();
        let expected_id = session.user.id;
        req.extensions_mut().insert(session);

        let mut payload = Payload::None;
        let extracted = Authenticated::from_request(&req, &mut payload).await;
        assert!(extracted.is_ok());
        let extracted = extracted.unwrap();
        assert_eq!(extracted.user.id, expected_id);
        assert_eq!(extracted.token, "token-one");
    }

    #[actix_rt::test]
    async fn test_authenticated_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();
        // No session inserted into extensions

        let mut payload = Payload::None;
        let extracted = Authenticated::from_request(&req, &mut payload).await;
        assert!(extracted.is_err());

        let err = extracted.unwrap_err();
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
