use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::Method;
use actix_web::{Error, HttpResponse};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::env;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type";
const MAX_AGE_SECS: &str = "86400";

#[derive(Clone, Debug)]
enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

/// Adds CORS headers for requests whose `Origin` is allowed and answers preflight requests
/// directly. Requests without an `Origin` header pass through untouched.
#[derive(Clone, Debug)]
pub struct CorsMiddleware {
    allowed_origins: AllowedOrigins,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::with_origins(env::CONF.cors_allowed_origins.as_slice())
    }
}

impl CorsMiddleware {
    /// A `*` entry allows every origin.
    pub fn with_origins<S: AsRef<str>>(origins: &[S]) -> Self {
        let origins = origins
            .iter()
            .map(|o| o.as_ref().trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect::<Vec<_>>();

        let allowed_origins = if origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        };

        Self { allowed_origins }
    }

    fn allow_origin_header(&self, origin: &str) -> Option<HeaderValue> {
        match &self.allowed_origins {
            AllowedOrigins::Any => Some(HeaderValue::from_static("*")),
            AllowedOrigins::List(list) if list.iter().any(|o| o == origin) => {
                HeaderValue::from_str(origin).ok()
            }
            AllowedOrigins::List(_) => None,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CorsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = CorsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorsMiddlewareService {
            service,
            cors: self.clone(),
        }))
    }
}

pub struct CorsMiddlewareService<S> {
    service: S,
    cors: CorsMiddleware,
}

impl<S, B> Service<ServiceRequest> for CorsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let allow_origin = req
            .headers()
            .get(header::ORIGIN)
            .and_then(|h| h.to_str().ok())
            .and_then(|origin| self.cors.allow_origin_header(origin));

        let is_preflight = req.method() == Method::OPTIONS
            && req
                .headers()
                .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

        if is_preflight {
            let mut res = HttpResponse::NoContent();

            if let Some(allow_origin) = allow_origin {
                res.insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin));
                res.insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS));
                res.insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS));
                res.insert_header((header::ACCESS_CONTROL_MAX_AGE, MAX_AGE_SECS));
                res.insert_header((header::VARY, "Origin"));
            }

            let res = req.into_response(res.finish());
            return Box::pin(async move { Ok(res) });
        }

        let req_fut = self.service.call(req);

        Box::pin(async move {
            let mut res = req_fut.await?.map_into_boxed_body();

            if let Some(allow_origin) = allow_origin {
                res.headers_mut()
                    .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
                res.headers_mut()
                    .insert(header::VARY, HeaderValue::from_static("Origin"));
            }

            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};

    macro_rules! init_app {
        ($cors:expr) => {
            test::init_service(
                App::new()
                    .wrap($cors)
                    .route("/", web::get().to(|| async { HttpResponse::Ok().body("ok") })),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_allowed_origin() {
        let app = init_app!(CorsMiddleware::with_origins(&["https://app.savvly.io/"]));

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://app.savvly.io"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("https://app.savvly.io")
        );
    }

    #[actix_web::test]
    async fn test_disallowed_or_missing_origin() {
        let app = init_app!(CorsMiddleware::with_origins(&["https://app.savvly.io"]));

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://evil.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[actix_web::test]
    async fn test_wildcard() {
        let app = init_app!(CorsMiddleware::with_origins(&["*"]));

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "http://localhost:3000"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[actix_web::test]
    async fn test_preflight() {
        let app = init_app!(CorsMiddleware::with_origins(&["https://app.savvly.io"]));

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/budgets")
            .insert_header((header::ORIGIN, "https://app.savvly.io"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_METHODS)
                .and_then(|v| v.to_str().ok()),
            Some(ALLOWED_METHODS)
        );
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
                .and_then(|v| v.to_str().ok()),
            Some(ALLOWED_HEADERS)
        );

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/")
            .insert_header((header::ORIGIN, "https://evil.example"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
