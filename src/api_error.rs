//! Classified request failures.
//!
//! An [`ApiError`] is the only failure a handler can report that reaches the
//! client verbatim. Return one (or anything convertible into
//! [`anyhow::Error`]) from a handler and the
//! [`ErrorResponder`](crate::middleware::ErrorResponder) renders it:
//!
//! ```text
//! {"error": "<code>", "message": "<message>", "details": {...}}
//! ```
//!
//! `details` is omitted when absent. Any error that is *not* an `ApiError`
//! is unclassified and collapses to a fixed 500 envelope.

use std::borrow::Cow;
use std::fmt;

use http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

/// A typed failure carrying a stable machine-readable code, a human message,
/// the HTTP status to emit and optional structured details.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiError {
    code: Cow<'static, str>,
    message: Cow<'static, str>,
    status: StatusCode,
    details: Option<Map<String, Value>>,
}

impl ApiError {
    /// The user could not be located.
    pub const USER_NOT_FOUND: Self =
        Self::from_static("user_not_found", "user not found", StatusCode::NOT_FOUND);

    /// The client supplied data that failed validation.
    pub const INVALID_INPUT: Self =
        Self::from_static("invalid_input", "invalid input", StatusCode::BAD_REQUEST);

    /// A protected route was called without an acceptable credential.
    pub const UNAUTHORIZED: Self =
        Self::from_static("unauthorized", "authentication required", StatusCode::UNAUTHORIZED);

    /// No route matches the request's method and path.
    pub const NOT_FOUND: Self =
        Self::from_static("not_found", "route not found", StatusCode::NOT_FOUND);

    /// The route exists but its handler has not been built yet.
    pub const NOT_IMPLEMENTED: Self =
        Self::from_static("not_implemented", "not implemented", StatusCode::NOT_IMPLEMENTED);

    /// The request body could not be read off the connection.
    pub const INVALID_BODY: Self =
        Self::from_static("invalid_body", "request body could not be read", StatusCode::BAD_REQUEST);

    /// Creates an error without details.
    ///
    /// `status` must be a 4xx or 5xx code; anything else is coerced to
    /// `500 Internal Server Error`.
    pub fn new(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
        status: StatusCode,
    ) -> Self {
        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self { code: code.into(), message: message.into(), status, details: None }
    }

    /// Creates an error carrying structured details.
    pub fn with_details(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
        status: StatusCode,
        details: Map<String, Value>,
    ) -> Self {
        Self { details: Some(details), ..Self::new(code, message, status) }
    }

    const fn from_static(code: &'static str, message: &'static str, status: StatusCode) -> Self {
        Self { code: Cow::Borrowed(code), message: Cow::Borrowed(message), status, details: None }
    }

    /// Adds one detail entry, keeping insertion order.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.get_or_insert_with(Map::new).insert(key.into(), value.into());
        self
    }

    pub fn code(&self) -> &str { &self.code }
    pub fn message(&self) -> &str { &self.message }
    pub fn status(&self) -> StatusCode { self.status }
    pub fn details(&self) -> Option<&Map<String, Value>> { self.details.as_ref() }

    /// The JSON envelope written to the client.
    pub(crate) fn to_body(&self) -> Envelope<'_> {
        Envelope { error: &self.code, message: &self.message, details: self.details.as_ref() }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Map<String, Value>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_has_no_details() {
        let e = ApiError::new("c", "msg", StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code(), "c");
        assert_eq!(e.message(), "msg");
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.details().is_none());
        assert_eq!(e.to_string(), "msg");
    }

    #[test]
    fn with_details_keeps_payload() {
        let mut details = Map::new();
        details.insert("foo".into(), json!("bar"));
        let e = ApiError::with_details("c", "msg", StatusCode::BAD_REQUEST, details);
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.details().and_then(|d| d.get("foo")), Some(&json!("bar")));
    }

    #[test]
    fn sentinel_statuses() {
        assert_eq!(ApiError::USER_NOT_FOUND.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::INVALID_INPUT.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::INVALID_INPUT.code(), "invalid_input");
    }

    #[test]
    fn non_error_status_is_coerced_to_500() {
        let e = ApiError::new("odd", "odd", StatusCode::OK);
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn body_omits_absent_details() {
        let body = serde_json::to_value(ApiError::INVALID_INPUT.to_body()).unwrap();
        assert_eq!(body, json!({"error": "invalid_input", "message": "invalid input"}));
    }

    #[test]
    fn details_preserve_insertion_order() {
        let e = ApiError::INVALID_INPUT
            .detail("zeta", 1)
            .detail("alpha", "x");
        let keys: Vec<_> = e.details().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
        assert_eq!(
            serde_json::to_string(&e.to_body()).unwrap(),
            r#"{"error":"invalid_input","message":"invalid input","details":{"zeta":1,"alpha":"x"}}"#
        );
    }
}
