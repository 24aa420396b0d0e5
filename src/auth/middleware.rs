use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::auth::token::TokenService;
use crate::error::AppError;
use crate::request_id::RequestId;

/// Requires a valid `Authorization: Bearer <token>` header.
///
/// On success the decoded `Claims` are stored in the request extensions for
/// `AuthenticatedUser`. On failure the request is answered with
/// `AppError::Unauthorized` without reaching the wrapped service, so outer
/// middleware (request id, access log) still see a normal response.
pub struct AuthMiddleware {
    tokens: Rc<TokenService>,
}

impl AuthMiddleware {
    pub fn new(tokens: TokenService) -> Self {
        Self {
            tokens: Rc::new(tokens),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            tokens: Rc::clone(&self.tokens),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    tokens: Rc<TokenService>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        let verified = match bearer {
            Some(token) => self.tokens.verify(token),
            None => Err(AppError::Unauthorized),
        };

        match verified {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(app_err) => {
                let rid = req
                    .extensions()
                    .get::<RequestId>()
                    .map(RequestId::to_string)
                    .unwrap_or_default();
                log::info!(
                    "[AuthMiddleware] {} rejected {} {}",
                    rid,
                    req.method(),
                    req.path()
                );
                let (request, _) = req.into_parts();
                let response = app_err.error_response().map_into_right_body();
                Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractors::AuthenticatedUser;
    use crate::models::UserView;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use chrono::Duration;

    fn tokens() -> TokenService {
        TokenService::new("middleware-test-secret", Duration::minutes(5))
    }

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().json(user.user_id())
    }

    #[actix_rt::test]
    async fn test_missing_token_is_unauthorized() {
        let app = test::init_service(
            App::new().service(
                web::scope("/private")
                    .wrap(AuthMiddleware::new(tokens()))
                    .route("", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/private").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, "e4010 unauthorized");
    }

    #[actix_rt::test]
    async fn test_valid_token_reaches_handler() {
        let token = tokens()
            .generate(&UserView {
                id: 42,
                username: "rider42".into(),
                name: "Forty Two".into(),
            })
            .unwrap();
        let app = test::init_service(
            App::new().service(
                web::scope("/private")
                    .wrap(AuthMiddleware::new(tokens()))
                    .route("", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/private")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, 42);
    }

    #[actix_rt::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let app = test::init_service(
            App::new().service(
                web::scope("/private")
                    .wrap(AuthMiddleware::new(tokens()))
                    .route("", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/private")
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
