//! Per-request state threaded through the stage chain.
//!
//! One [`Context`] is created per request and handed down as `&mut Context`.
//! It is owned by the task serving that request and dropped with it: no
//! locks, no sharing.

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use crate::logger::Logger;

/// Unique per-request token tying together log lines and the
/// `X-Request-ID` response header.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// A fresh random (UUID v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A caller credential as extracted from the request.
///
/// Nothing about it has been verified unless the mounted
/// [`Authenticator`](crate::middleware::Authenticator) says so. `Debug`
/// output is redacted.
#[derive(Clone, Eq, PartialEq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Typed request-scoped state.
pub struct Context {
    correlation_id: Option<CorrelationId>,
    logger: Logger,
    credential: Option<Credential>,
    errors: Vec<anyhow::Error>,
    headers: HeaderMap,
}

impl Context {
    /// A fresh context logging through `base` until a stage derives a
    /// request-scoped logger.
    pub fn new(base: Logger) -> Self {
        Self {
            correlation_id: None,
            logger: base,
            credential: None,
            errors: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Sets the correlation id. The first id set wins; later calls leave it
    /// untouched and return the id already in place.
    pub fn set_correlation_id(&mut self, id: CorrelationId) -> &CorrelationId {
        self.correlation_id.get_or_insert(id)
    }

    /// The request-scoped logger, or the base logger if none was derived yet.
    pub fn logger(&self) -> &Logger { &self.logger }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    pub fn credential(&self) -> Option<&Credential> { self.credential.as_ref() }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    /// Appends a failure to the request's error list. Only the last entry is
    /// rendered.
    pub fn record_error(&mut self, error: impl Into<anyhow::Error>) {
        self.errors.push(error.into());
    }

    pub fn errors(&self) -> &[anyhow::Error] { &self.errors }

    /// Drains the error list, returning the authoritative (last) entry.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        let last = self.errors.pop();
        self.errors.clear();
        last
    }

    /// Stages a header for the final response, whatever stage ends up
    /// producing it.
    pub fn set_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn response_headers(&self) -> &HeaderMap { &self.headers }

    pub(crate) fn take_response_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.headers)
    }
}
