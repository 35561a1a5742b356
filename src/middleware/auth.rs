//! Credential extraction for protected route groups.

use http::header::AUTHORIZATION;
use tracing::debug;

use super::{BoxFuture, Middleware, Next, Slot};
use crate::api_error::ApiError;
use crate::context::{Context, Credential};
use crate::request::Request;
use crate::response::Response;

/// Turns the raw `Authorization` header into a [`Credential`].
///
/// Verification is up to the implementation. `Ok(None)` means "no
/// credential", `Err` rejects the request with that error.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(&self, authorization: Option<&str>) -> Result<Option<Credential>, ApiError>;
}

/// Stores the header value verbatim. Verifies nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawHeader;

impl Authenticator for RawHeader {
    fn authenticate(&self, authorization: Option<&str>) -> Result<Option<Credential>, ApiError> {
        Ok(authorization.filter(|v| !v.is_empty()).map(Credential::new))
    }
}

/// Makes the caller's credential available to handlers.
///
/// Advisory by default: without a credential the request continues and the
/// handler decides. [`Auth::required`] rejects such requests with
/// `401 unauthorized` instead. An [`Authenticator`] error always rejects.
/// Mount it on the groups that need it, not globally.
pub struct Auth<A = RawHeader> {
    authenticator: A,
    required: bool,
}

impl Auth<RawHeader> {
    pub fn new() -> Self {
        Self::with(RawHeader)
    }
}

impl Default for Auth<RawHeader> {
    fn default() -> Self { Self::new() }
}

impl<A: Authenticator> Auth<A> {
    pub fn with(authenticator: A) -> Self {
        Self { authenticator, required: false }
    }

    /// Reject requests that end up without a credential.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl<A: Authenticator> Middleware for Auth<A> {
    fn handle<'a>(&'a self, req: Request, cx: &'a mut Context, next: Next<'a>)
        -> BoxFuture<'a, Response>
    {
        Box::pin(async move {
            let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());

            let rejection = match self.authenticator.authenticate(header) {
                Ok(Some(credential)) => {
                    cx.set_credential(credential);
                    None
                }
                Ok(None) if self.required => Some(ApiError::UNAUTHORIZED),
                Ok(None) => None,
                Err(e) => Some(e),
            };

            if let Some(err) = rejection {
                cx.logger().in_scope(|| debug!(code = %err.code(), path = %req.path(), "request rejected by auth"));
                let status = err.status();
                cx.record_error(err);
                return Response::status(status);
            }

            next.run(req, cx).await
        })
    }

    fn slot(&self) -> Slot { Slot::Auth }
}
