//! Cross-origin resource sharing.

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::{HeaderValue, Method, StatusCode};

use super::{BoxFuture, Middleware, Next, Slot};
use crate::context::Context;
use crate::request::Request;
use crate::response::Response;

const ANY: &str = "*";
const METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const HEADERS: &str = "Authorization, Content-Type, X-Request-ID";

/// Makes the API usable from browsers.
///
/// Every response carries `Access-Control-Allow-Origin`. A preflight
/// (`OPTIONS`) is answered right here with `204 No Content` and the allowed
/// methods and headers; nothing below this stage runs for it.
#[derive(Clone, Debug)]
pub struct Cors {
    allow_origin: HeaderValue,
}

impl Cors {
    /// `Access-Control-Allow-Origin: *`.
    pub fn permissive() -> Self {
        Self { allow_origin: HeaderValue::from_static(ANY) }
    }

    /// A single allowed origin. Falls back to `*` if `origin` is not a valid
    /// header value.
    pub fn origin(origin: &str) -> Self {
        Self { allow_origin: HeaderValue::from_str(origin).unwrap_or_else(|_| HeaderValue::from_static(ANY)) }
    }
}

impl Default for Cors {
    fn default() -> Self { Self::permissive() }
}

impl Middleware for Cors {
    fn handle<'a>(&'a self, req: Request, cx: &'a mut Context, next: Next<'a>)
        -> BoxFuture<'a, Response>
    {
        Box::pin(async move {
            cx.set_response_header(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());

            if req.method() == Method::OPTIONS {
                cx.set_response_header(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(METHODS));
                cx.set_response_header(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(HEADERS));
                return Response::status(StatusCode::NO_CONTENT);
            }

            next.run(req, cx).await
        })
    }

    fn slot(&self) -> Slot { Slot::Cors }
}
