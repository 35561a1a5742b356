//! Middleware stages.
//!
//! A stage intercepts a request, may touch the per-request [`Context`], and
//! decides whether to call the rest of the chain through [`Next`]. Stages
//! are the place for cross-cutting concerns; handlers stay business-only.
//!
//! Built-in stages, outermost first:
//!
//! | Stage | Slot | Applies to |
//! |---|---|---|
//! | [`Recovery`] | `Recovery` | all routes |
//! | [`ErrorResponder`] | `Errors` | all routes |
//! | [`RequestId`] | `RequestId` | all routes |
//! | [`Logging`] | `Logging` | all routes |
//! | [`Cors`] | `Cors` | all routes |
//! | [`Auth`] | `Auth` | protected groups |
//!
//! The router sorts each route's stages by [`Slot`] when it builds the chain,
//! so the relative order above holds no matter the order of `layer` calls.
//! Custom stages go innermost, in registration order.
//!
//! # Writing a stage
//!
//! ```rust
//! use alchemorsel::Request;
//! use alchemorsel::Context;
//! use alchemorsel::middleware::{BoxFuture, Middleware, Next};
//! use alchemorsel::Response;
//!
//! struct Noop;
//!
//! impl Middleware for Noop {
//!     fn handle<'a>(&'a self, req: Request, cx: &'a mut Context, next: Next<'a>)
//!         -> BoxFuture<'a, Response>
//!     {
//!         Box::pin(async move { next.run(req, cx).await })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;
use crate::response::Response;

mod auth;
mod cors;
mod error_responder;
mod logging;
mod recovery;
mod request_id;

pub use auth::{Auth, Authenticator, RawHeader};
pub use cors::Cors;
pub use error_responder::ErrorResponder;
pub use logging::Logging;
pub use recovery::Recovery;
pub use request_id::{RequestId, X_REQUEST_ID};

/// A heap-allocated, type-erased future borrowing from the chain for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fixed position of a stage in the chain. Lower slots wrap higher ones.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Slot {
    Recovery,
    Errors,
    RequestId,
    Logging,
    Cors,
    Auth,
    Custom,
}

/// One request interceptor.
pub trait Middleware: Send + Sync + 'static {
    /// Handles `req`, calling `next` at most once (it is consumed by
    /// [`Next::run`]). Not calling it short-circuits the chain.
    fn handle<'a>(&'a self, req: Request, cx: &'a mut Context, next: Next<'a>)
        -> BoxFuture<'a, Response>;

    fn slot(&self) -> Slot { Slot::Custom }
}

/// Something that turns a request into a response: a wrapped stage, or the
/// handler at the bottom of the chain.
pub(crate) trait Endpoint: Send + Sync + 'static {
    fn call<'a>(&'a self, req: Request, cx: &'a mut Context) -> BoxFuture<'a, Response>;
}

/// The rest of the chain below the current stage.
pub struct Next<'a> {
    inner: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub(crate) fn new(inner: &'a dyn Endpoint) -> Self {
        Self { inner }
    }

    /// Runs the remaining stages and the handler.
    pub fn run<'b>(self, req: Request, cx: &'b mut Context) -> BoxFuture<'b, Response>
    where
        'a: 'b,
    {
        self.inner.call(req, cx)
    }
}

/// A stage bound to everything beneath it. Built once per route at startup.
pub(crate) struct Layered {
    stage: Arc<dyn Middleware>,
    inner: Arc<dyn Endpoint>,
}

impl Endpoint for Layered {
    fn call<'a>(&'a self, req: Request, cx: &'a mut Context) -> BoxFuture<'a, Response> {
        self.stage.handle(req, cx, Next::new(&*self.inner))
    }
}

/// Folds `stages` (outermost first) around `endpoint`.
pub(crate) fn compose(stages: &[Arc<dyn Middleware>], endpoint: Arc<dyn Endpoint>) -> Arc<dyn Endpoint> {
    stages.iter().rev().fold(endpoint, |inner, stage| {
        Arc::new(Layered { stage: Arc::clone(stage), inner })
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Terminal endpoint wrapping a plain closure.
    pub(crate) struct Terminal<F>(pub F);

    impl<F> Endpoint for Terminal<F>
    where
        F: Fn(Request, &mut Context) -> Response + Send + Sync + 'static,
    {
        fn call<'a>(&'a self, req: Request, cx: &'a mut Context) -> BoxFuture<'a, Response> {
            let res = (self.0)(req, cx);
            Box::pin(async move { res })
        }
    }

    pub(crate) async fn run(
        stages: Vec<Arc<dyn Middleware>>,
        terminal: impl Fn(Request, &mut Context) -> Response + Send + Sync + 'static,
        req: Request,
        cx: &mut Context,
    ) -> Response {
        let chain = compose(&stages, Arc::new(Terminal(terminal)));
        chain.call(req, cx).await
    }
}
