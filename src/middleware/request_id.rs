//! Correlation id assignment.

use http::{HeaderName, HeaderValue};
use tracing::{Instrument, info_span, warn};

use super::{BoxFuture, Middleware, Next, Slot};
use crate::context::{Context, CorrelationId};
use crate::request::Request;
use crate::response::Response;

/// Response header echoing the correlation id.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Assigns every request a fresh [`CorrelationId`].
///
/// The id is stored in the context, echoed as `X-Request-ID` on whatever
/// response the request ends with, and attached to a child logger (span
/// `request`, field `request_id`) that replaces the base logger in the
/// context. The rest of the chain runs inside that span, so plain `tracing`
/// macros below this stage are correlated too.
///
/// Must sit outside [`Logging`](super::Logging).
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestId;

impl RequestId {
    pub fn new() -> Self { Self }
}

impl Middleware for RequestId {
    fn handle<'a>(&'a self, req: Request, cx: &'a mut Context, next: Next<'a>)
        -> BoxFuture<'a, Response>
    {
        Box::pin(async move {
            let id = cx.set_correlation_id(CorrelationId::generate()).clone();

            let logger = cx.logger().child(|| info_span!("request", request_id = %id));
            match HeaderValue::from_str(id.as_str()) {
                Ok(value) => cx.set_response_header(X_REQUEST_ID.clone(), value),
                Err(e) => logger.in_scope(|| warn!("correlation id is not a valid header value: {e}")),
            }
            let span = logger.span().clone();
            cx.set_logger(logger);

            next.run(req, cx).instrument(span).await
        })
    }

    fn slot(&self) -> Slot { Slot::RequestId }
}
