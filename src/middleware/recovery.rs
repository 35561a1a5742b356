//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use serde_json::json;
use tracing::error;

use super::{BoxFuture, Middleware, Next, Slot};
use crate::context::Context;
use crate::request::Request;
use crate::response::Response;

/// Turns a panic anywhere below it into `500 {"error":"internal server error"}`.
///
/// Must be the outermost stage so faults raised by every other stage are
/// caught too. The worker task survives and keeps serving the connection.
/// Errors recorded before the fault are discarded: the fault response is
/// final.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recovery;

impl Recovery {
    pub fn new() -> Self { Self }
}

impl Middleware for Recovery {
    fn handle<'a>(&'a self, req: Request, cx: &'a mut Context, next: Next<'a>)
        -> BoxFuture<'a, Response>
    {
        Box::pin(async move {
            let inner = &mut *cx;
            // The inner chain is built lazily inside this block so a panic
            // while constructing it is caught as well.
            let outcome = AssertUnwindSafe(async move { next.run(req, inner).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(res) => res,
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    cx.logger().in_scope(|| error!(panic = %reason, "panic recovered"));
                    cx.take_error();
                    internal_error()
                }
            }
        })
    }

    fn slot(&self) -> Slot { Slot::Recovery }
}

/// The fixed body every unclassified failure collapses to.
pub(crate) fn internal_error() -> Response {
    Response::json_value(
        StatusCode::INTERNAL_SERVER_ERROR,
        &json!({ "error": "internal server error" }),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;

    use super::*;
    use crate::ApiError;
    use crate::logger::Logger;
    use crate::middleware::test_support::run;
    use crate::request::test_request;

    #[tokio::test]
    async fn panic_becomes_internal_error() {
        let mut cx = Context::new(Logger::disabled());
        let res = run(
            vec![Arc::new(Recovery)],
            |_, _| panic!("boom"),
            test_request(Method::GET, "/panic"),
            &mut cx,
        )
        .await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), br#"{"error":"internal server error"}"#);
    }

    #[tokio::test]
    async fn errors_recorded_before_the_fault_are_dropped() {
        let mut cx = Context::new(Logger::disabled());
        let res = run(
            vec![Arc::new(Recovery)],
            |_, cx| {
                cx.record_error(ApiError::INVALID_INPUT);
                panic!("after recording")
            },
            test_request(Method::GET, "/"),
            &mut cx,
        )
        .await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(cx.errors().is_empty());
    }

    #[tokio::test]
    async fn normal_responses_pass_through() {
        let mut cx = Context::new(Logger::disabled());
        let res = run(
            vec![Arc::new(Recovery)],
            |_, _| Response::text("fine"),
            test_request(Method::GET, "/"),
            &mut cx,
        )
        .await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"fine");
    }

    #[test]
    fn panic_messages() {
        let p: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(p.as_ref()), "static");
        let p: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(p.as_ref()), "owned");
        let p: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(p.as_ref()), "non-string panic payload");
    }
}
