//! Centralized error-to-response translation.

use tracing::error;

use super::recovery::internal_error;
use super::{BoxFuture, Middleware, Next, Slot};
use crate::api_error::ApiError;
use crate::context::Context;
use crate::request::Request;
use crate::response::Response;

/// Renders the request's error list into exactly one JSON response.
///
/// Runs after every inner stage and the handler have returned:
///
/// - no recorded error: the response stands as produced;
/// - last error is an [`ApiError`]: its status and
///   `{"error", "message", "details"?}` envelope;
/// - anything else: `500 {"error":"internal server error"}`.
///
/// The error is logged at `ERROR` through the request logger and the list is
/// drained, so each failure is rendered once.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorResponder;

impl ErrorResponder {
    pub fn new() -> Self { Self }
}

impl Middleware for ErrorResponder {
    fn handle<'a>(&'a self, req: Request, cx: &'a mut Context, next: Next<'a>)
        -> BoxFuture<'a, Response>
    {
        Box::pin(async move {
            let res = next.run(req, cx).await;
            match cx.take_error() {
                None => res,
                Some(err) => render(cx, &err),
            }
        })
    }

    fn slot(&self) -> Slot { Slot::Errors }
}

fn render(cx: &Context, err: &anyhow::Error) -> Response {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        cx.logger().in_scope(|| error!(code = %api.code(), status = api.status().as_u16(), "{}", api.message()));
        Response::json_value(api.status(), &api.to_body())
    } else {
        cx.logger().in_scope(|| error!("unhandled error: {err:#}"));
        internal_error()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{Method, StatusCode};
    use serde_json::{Value, json};

    use super::*;
    use crate::logger::Logger;
    use crate::middleware::test_support::run;
    use crate::request::test_request;

    fn body(res: &Response) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn api_error_is_rendered_verbatim() {
        let mut cx = Context::new(Logger::disabled());
        let res = run(
            vec![Arc::new(ErrorResponder)],
            |_, cx| {
                cx.record_error(ApiError::INVALID_INPUT.detail("field", "name"));
                Response::status(StatusCode::OK)
            },
            test_request(Method::GET, "/fail"),
            &mut cx,
        )
        .await;

        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&res),
            json!({"error": "invalid_input", "message": "invalid input", "details": {"field": "name"}})
        );
        assert!(cx.errors().is_empty());
    }

    #[tokio::test]
    async fn unclassified_error_hides_detail() {
        let mut cx = Context::new(Logger::disabled());
        let res = run(
            vec![Arc::new(ErrorResponder)],
            |_, cx| {
                cx.record_error(anyhow::anyhow!("db password is hunter2"));
                Response::status(StatusCode::OK)
            },
            test_request(Method::GET, "/boom"),
            &mut cx,
        )
        .await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res), json!({"error": "internal server error"}));
    }

    #[tokio::test]
    async fn last_error_wins() {
        let mut cx = Context::new(Logger::disabled());
        let res = run(
            vec![Arc::new(ErrorResponder)],
            |_, cx| {
                cx.record_error(anyhow::anyhow!("first"));
                cx.record_error(ApiError::USER_NOT_FOUND);
                Response::status(StatusCode::OK)
            },
            test_request(Method::GET, "/"),
            &mut cx,
        )
        .await;

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(body(&res)["error"], "user_not_found");
    }

    #[tokio::test]
    async fn no_error_leaves_response_alone() {
        let mut cx = Context::new(Logger::disabled());
        let res = run(
            vec![Arc::new(ErrorResponder)],
            |_, _| Response::builder().status(StatusCode::ACCEPTED).text("queued"),
            test_request(Method::POST, "/"),
            &mut cx,
        )
        .await;

        assert_eq!(res.status_code(), StatusCode::ACCEPTED);
        assert_eq!(res.body(), b"queued");
    }
}
