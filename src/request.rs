//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::context::{Context, CorrelationId, Credential};
use crate::logger::Logger;

/// An incoming HTTP request with its body fully read.
///
/// Besides the wire data, a request exposes the handler-facing slice of the
/// request context: correlation id, request-scoped logger and credential.
/// These are bound right before the handler runs.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) correlation_id: Option<CorrelationId>,
    pub(crate) logger: Logger,
    pub(crate) credential: Option<Credential>,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, body: Bytes, logger: Logger) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            correlation_id: None,
            logger,
            credential: None,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup (names are case-insensitive). Non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/recipes/{id}`, `req.param("id")` on `/recipes/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Request-scoped logger; the base logger when no stage derived one.
    pub fn logger(&self) -> &Logger { &self.logger }

    /// Credential stored by the auth stage, if any.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Copies the handler-visible context into the request.
    pub(crate) fn bind(&mut self, cx: &Context) {
        self.correlation_id = cx.correlation_id().cloned();
        self.logger = cx.logger().clone();
        self.credential = cx.credential().cloned();
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_request(method: Method, uri: &str) -> Request {
    let (parts, ()) = http::Request::builder()
        .method(method)
        .uri(uri)
        .body(())
        .unwrap()
        .into_parts();
    Request::new(parts, Bytes::new(), Logger::disabled())
}
