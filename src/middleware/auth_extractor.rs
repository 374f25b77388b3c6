// src/middleware/auth_extractor.rs - bearer token gate for mutating routes
use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use log::{debug, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::token_service::{Claims, TokenService};

/// Extractor output: the caller whose token verified.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> Uuid {
        self.claims.id
    }
}

/// Token part of `Authorization: Bearer <token>`, if there is one.
fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty()).then_some(token)
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<AuthenticatedUser, AppError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(tokens) = req.app_data::<web::Data<TokenService>>() else {
            error!("TokenService missing from app data");
            return ready(Err(AppError::Internal("token service not configured".into())));
        };

        let Some(token) = bearer_token(req) else {
            return ready(Err(AppError::Unauthorized("Missing bearer token".into())));
        };

        match tokens.verify(token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims.clone());
                ready(Ok(AuthenticatedUser { claims }))
            }
            Err(e) => {
                debug!("rejected token: {}", e);
                ready(Err(AppError::Forbidden("Invalid or expired token".into())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App, HttpResponse};

    const SECRET: &str = "extractor-secret";

    async fn whoami(user: AuthenticatedUser, req: HttpRequest) -> HttpResponse {
        let from_ctx = req.extensions().get::<Claims>().map(|c| c.id);
        assert_eq!(from_ctx, Some(user.user_id()));
        HttpResponse::Ok().body(user.user_id().to_string())
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(TokenService::new(SECRET)))
                    .route("/me", web::post().to(whoami)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let app = app!();
        let resp = test::call_service(&app, test::TestRequest::post().uri("/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/me")
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/me")
            .insert_header(("Authorization", "Bearer "))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn bad_token_is_forbidden() {
        let app = app!();
        let foreign = TokenService::new("other-secret")
            .issue(Uuid::new_v4(), "x@example.com")
            .unwrap();
        for token in ["garbage", foreign.as_str()] {
            let req = test::TestRequest::post()
                .uri("/me")
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
        }
    }

    #[actix_web::test]
    async fn valid_token_reaches_handler_with_claims() {
        let app = app!();
        let id = Uuid::new_v4();
        let token = TokenService::new(SECRET).issue(id, "ada@example.com").unwrap();
        let req = test::TestRequest::post()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();

        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, id.to_string().as_bytes());
    }
}
