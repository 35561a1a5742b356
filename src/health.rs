//! Health endpoints.
//!
//! | Path | Question |
//! |---|---|
//! | `/api/v1/health` | Is the API up? Used by docker-compose and clients. |
//! | `/healthz` | Kubernetes liveness: is the process alive? Failure → restart. |
//! | `/readyz` | Kubernetes readiness: can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! All three need no credential and touch no dependency.

use serde_json::{Value, json};

use crate::request::Request;
use crate::response::{Json, Response};

/// `{"status":"healthy"}` with 200.
pub async fn health(_req: Request) -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Always `200 OK` with body `"ok"`. If the process can answer HTTP at all, it is alive.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;
    use crate::request::test_request;
    use crate::response::IntoResponse;

    #[tokio::test]
    async fn health_body() {
        let res = health(test_request(Method::GET, "/api/v1/health")).await.into_response();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), br#"{"status":"healthy"}"#);
    }

    #[tokio::test]
    async fn probes() {
        assert_eq!(liveness(test_request(Method::GET, "/healthz")).await.body(), b"ok");
        assert_eq!(readiness(test_request(Method::GET, "/readyz")).await.body(), b"ready");
    }
}
