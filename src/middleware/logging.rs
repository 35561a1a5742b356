//! Per-request access log.

use std::time::Instant;

use http::StatusCode;
use tracing::info;

use super::{BoxFuture, Middleware, Next, Slot};
use crate::api_error::ApiError;
use crate::context::Context;
use crate::request::Request;
use crate::response::Response;

/// Emits one `INFO` record per completed request with `method`, `path`,
/// `status` and `duration`.
///
/// `status` is the one the client receives: when an error is pending for
/// the error responder, its status wins over the placeholder response.
///
/// The duration covers every stage and the handler below this one. The
/// record goes through the request-scoped logger, so it carries the
/// correlation id when [`RequestId`](super::RequestId) sits outside.
/// The response is returned untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Logging;

impl Logging {
    pub fn new() -> Self { Self }
}

impl Middleware for Logging {
    fn handle<'a>(&'a self, req: Request, cx: &'a mut Context, next: Next<'a>)
        -> BoxFuture<'a, Response>
    {
        Box::pin(async move {
            let start = Instant::now();
            let method = req.method().clone();
            let path = req.path().to_owned();

            let res = next.run(req, cx).await;

            let duration = start.elapsed();
            let status = sent_status(cx, &res);
            cx.logger().in_scope(|| {
                info!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    duration = ?duration,
                    "request completed"
                );
            });
            res
        })
    }

    fn slot(&self) -> Slot { Slot::Logging }
}

fn sent_status(cx: &Context, res: &Response) -> StatusCode {
    match cx.errors().last() {
        Some(err) => err
            .downcast_ref::<ApiError>()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, ApiError::status),
        None => res.status_code(),
    }
}
