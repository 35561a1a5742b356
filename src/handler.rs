//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in one routing
//! table, so each handler is hidden behind a trait object
//! (`dyn ErasedHandler`) and then placed at the bottom of its route's stage
//! chain as an endpoint.
//!
//! ```text
//! async fn get_recipe(req: Request) -> Result<Json<Recipe>, ApiError>   ← user writes this
//!        ↓ router.get("/recipes/{id}", get_recipe)
//! get_recipe.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_recipe))                       ← stored as BoxedHandler
//!        ↓ wrapped in HandlerEndpoint at router build time
//! endpoint.call(req, cx)  at request time
//!        ↓ binds context into req, awaits the handler,
//!          moves an `Err` onto the request's error list
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::middleware::{BoxFuture, Endpoint};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>>;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Return `Result<T, E>` with `E: Into<anyhow::Error>` to report a failure;
/// the error responder renders it.
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Chain terminal ────────────────────────────────────────────────────────────

/// Bottom of a route's chain: runs the handler with the context bound.
pub(crate) struct HandlerEndpoint {
    handler: BoxedHandler,
}

impl HandlerEndpoint {
    pub(crate) fn new(handler: BoxedHandler) -> Self {
        Self { handler }
    }
}

impl Endpoint for HandlerEndpoint {
    fn call<'a>(&'a self, mut req: Request, cx: &'a mut Context) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            req.bind(cx);
            let mut res = self.handler.call(req).await;
            if let Some(failure) = res.failure.take() {
                cx.record_error(failure);
            }
            res
        })
    }
}
