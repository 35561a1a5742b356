//! The recipe API route table.
//!
//! Only the request pipeline is implemented here. Business endpoints are
//! registered so their paths, methods and auth requirements are fixed, and
//! answer `501 not_implemented` until their services exist.

use tracing::debug;

use crate::api_error::ApiError;
use crate::config::Config;
use crate::health;
use crate::middleware::{Auth, Cors, ErrorResponder, Logging, Recovery, RequestId};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// Builds the full route table with the global stack mounted.
///
/// `/api/v1/health` and the auth endpoints are public; everything under
/// users, recipes and llm sits behind [`Auth`].
pub fn router(config: &Config) -> Router {
    Router::new()
        .layer(Recovery)
        .layer(ErrorResponder)
        .layer(RequestId)
        .layer(Logging)
        .layer(Cors::origin(&config.cors_origin))
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness)
        .group("/api/v1", |v1| v1
            .get("/health", health::health)
            .group("/auth", |auth| auth
                .post("/register", not_implemented)
                .post("/login", not_implemented)
                .post("/refresh", not_implemented))
            .group("", |protected| protected
                .layer(Auth::new())
                .group("/users", |users| users
                    .get("/profile", not_implemented)
                    .put("/profile", not_implemented)
                    .post("/profile/picture", not_implemented))
                .group("/recipes", |recipes| recipes
                    .get("", not_implemented)
                    .post("", not_implemented)
                    .get("/{id}", not_implemented)
                    .post("/{id}/favorite", not_implemented)
                    .delete("/{id}/favorite", not_implemented))
                .group("/llm", |llm| llm
                    .post("/generate", not_implemented))))
}

async fn not_implemented(req: Request) -> Result<Response, ApiError> {
    req.logger().in_scope(|| debug!(method = %req.method(), path = %req.path(), "endpoint not implemented"));
    Err(ApiError::NOT_IMPLEMENTED)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http_body_util::{BodyExt, Empty};

    use super::*;
    use crate::logger::Logger;

    async fn call(method: &str, uri: &str) -> (http::StatusCode, Bytes) {
        let app = router(&Config::default()).into_app(Logger::disabled()).unwrap();
        let req = http::Request::builder().method(method).uri(uri).body(Empty::<Bytes>::new()).unwrap();
        let res = app.call(req).await;
        (res.status(), res.into_body().collect().await.unwrap().to_bytes())
    }

    #[test]
    fn route_table_has_no_conflicts() {
        assert!(router(&Config::default()).into_app(Logger::disabled()).is_ok());
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = call("GET", "/api/v1/health").await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body, r#"{"status":"healthy"}"#);
    }

    #[tokio::test]
    async fn business_endpoints_answer_not_implemented() {
        for (method, uri) in [
            ("POST", "/api/v1/auth/login"),
            ("GET", "/api/v1/recipes"),
            ("GET", "/api/v1/recipes/7"),
            ("DELETE", "/api/v1/recipes/7/favorite"),
            ("POST", "/api/v1/llm/generate"),
        ] {
            let (status, body) = call(method, uri).await;
            assert_eq!(status, http::StatusCode::NOT_IMPLEMENTED, "{method} {uri}");
            assert_eq!(body, r#"{"error":"not_implemented","message":"not implemented"}"#);
        }
    }

    #[tokio::test]
    async fn wrong_method_is_not_found() {
        let (status, _) = call("DELETE", "/api/v1/health").await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
    }
}
