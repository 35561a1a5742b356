//! Route table, stage composition and per-request dispatch.
//!
//! One radix tree per HTTP method, O(path-length) lookup. Each route's
//! stage chain is composed once, in [`Router::into_app`]; a request only
//! looks its chain up and runs it.
//!
//! ```rust,no_run
//! use alchemorsel::{Json, Logger, Request, Router};
//! use alchemorsel::middleware::{Auth, Cors, ErrorResponder, Logging, Recovery, RequestId};
//! use serde_json::{json, Value};
//!
//! async fn health(_req: Request) -> Json<Value> { Json(json!({"status": "healthy"})) }
//! async fn profile(req: Request) -> String {
//!     req.credential().map(|c| c.as_str().to_owned()).unwrap_or_default()
//! }
//!
//! let app = Router::new()
//!     .layer(Recovery)
//!     .layer(ErrorResponder)
//!     .layer(RequestId)
//!     .layer(Logging)
//!     .layer(Cors::permissive())
//!     .group("/api/v1", |api| api
//!         .get("/health", health)
//!         .group("", |protected| protected
//!             .layer(Auth::new())
//!             .get("/users/profile", profile)))
//!     .into_app(Logger::disabled())
//!     .unwrap();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use matchit::Router as MatchitRouter;
use tracing::instrument::WithSubscriber;
use tracing::warn;

use crate::api_error::ApiError;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler, HandlerEndpoint};
use crate::logger::{LogService, Logger};
use crate::middleware::{
    BoxFuture, Cors, Endpoint, ErrorResponder, Logging, Middleware, Recovery, RequestId, compose,
};
use crate::request::Request;
use crate::response::Response;

// ── Builders ──────────────────────────────────────────────────────────────────

/// A set of routes sharing a path prefix and extra stages.
///
/// A group's stages wrap every route in it and in its nested groups,
/// whether registered before or after the `layer` call.
pub struct Group {
    prefix: String,
    stages: Vec<Arc<dyn Middleware>>,
    routes: Vec<Route>,
    groups: Vec<Group>,
}

struct Route {
    method: Method,
    path: String,
    handler: BoxedHandler,
}

impl Group {
    fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_owned(), stages: Vec::new(), routes: Vec::new(), groups: Vec::new() }
    }

    /// Adds a stage to every route of this group.
    pub fn layer(mut self, stage: impl Middleware) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Registers a handler for a method + path pair, relative to the prefix.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` reads them.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes.push(Route { method, path: path.to_owned(), handler: handler.into_boxed_handler() });
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self { self.on(Method::GET, path, handler) }
    pub fn post(self, path: &str, handler: impl Handler) -> Self { self.on(Method::POST, path, handler) }
    pub fn put(self, path: &str, handler: impl Handler) -> Self { self.on(Method::PUT, path, handler) }
    pub fn patch(self, path: &str, handler: impl Handler) -> Self { self.on(Method::PATCH, path, handler) }
    pub fn delete(self, path: &str, handler: impl Handler) -> Self { self.on(Method::DELETE, path, handler) }

    /// Nests a group under this one's prefix and stages.
    pub fn group(mut self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        self.groups.push(build(Group::new(prefix)));
        self
    }

    /// Flattens into `(method, full path, stages outermost first, handler)`.
    fn flatten(
        self,
        parent_prefix: &str,
        parent_stages: &[Arc<dyn Middleware>],
        out: &mut Vec<(Method, String, Vec<Arc<dyn Middleware>>, BoxedHandler)>,
    ) {
        let prefix = format!("{parent_prefix}{}", self.prefix);
        let stages: Vec<_> = parent_stages.iter().chain(&self.stages).cloned().collect();

        for route in self.routes {
            out.push((route.method, format!("{prefix}{}", route.path), stages.clone(), route.handler));
        }
        for group in self.groups {
            group.flatten(&prefix, &stages, out);
        }
    }
}

/// The application router.
///
/// Stages added with [`Router::layer`] are global: they wrap every route and
/// also unmatched requests. Build it once at startup; hand the result of
/// [`Router::into_app`] (or the router itself) to the [`Server`](crate::Server).
pub struct Router {
    root: Group,
}

impl Router {
    pub fn new() -> Self {
        Self { root: Group::new("") }
    }

    /// Router with the global stack mounted: recovery, error responder,
    /// request id, access log, permissive CORS.
    pub fn standard() -> Self {
        Self::new()
            .layer(Recovery)
            .layer(ErrorResponder)
            .layer(RequestId)
            .layer(Logging)
            .layer(Cors::permissive())
    }

    pub fn layer(self, stage: impl Middleware) -> Self {
        Self { root: self.root.layer(stage) }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        Self { root: self.root.on(method, path, handler) }
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self { self.on(Method::GET, path, handler) }
    pub fn post(self, path: &str, handler: impl Handler) -> Self { self.on(Method::POST, path, handler) }
    pub fn put(self, path: &str, handler: impl Handler) -> Self { self.on(Method::PUT, path, handler) }
    pub fn patch(self, path: &str, handler: impl Handler) -> Self { self.on(Method::PATCH, path, handler) }
    pub fn delete(self, path: &str, handler: impl Handler) -> Self { self.on(Method::DELETE, path, handler) }

    pub fn group(self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        Self { root: self.root.group(prefix, build) }
    }

    /// Composes every route's chain and returns the servable [`App`].
    ///
    /// Each route gets the global stages plus those of its enclosing groups,
    /// ordered by [`Slot`](crate::middleware::Slot). `logger` becomes the
    /// base logger of every request.
    pub fn into_app(self, logger: Logger) -> Result<App, Error> {
        let global = ordered(self.root.stages.clone());

        let mut flat = Vec::new();
        self.root.flatten("", &[], &mut flat);

        let mut routes: HashMap<Method, MatchitRouter<Arc<dyn Endpoint>>> = HashMap::new();
        for (method, path, stages, handler) in flat {
            let chain = compose(&ordered(stages), Arc::new(HandlerEndpoint::new(handler)));
            routes
                .entry(method)
                .or_default()
                .insert(path.clone(), chain)
                .map_err(|source| Error::Route { path, source })?;
        }

        Ok(App {
            routes,
            fallback: compose(&global, Arc::new(Reject(ApiError::NOT_FOUND))),
            unreadable: compose(&global, Arc::new(Reject(ApiError::INVALID_BODY))),
            log: LogService::new(logger),
        })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn ordered(mut stages: Vec<Arc<dyn Middleware>>) -> Vec<Arc<dyn Middleware>> {
    // Stable: custom stages keep their registration order.
    stages.sort_by_key(|s| s.slot());
    stages
}

/// Terminal that fails every request with a fixed error: unmatched routes,
/// unreadable bodies.
struct Reject(ApiError);

impl Endpoint for Reject {
    fn call<'a>(&'a self, _req: Request, cx: &'a mut Context) -> BoxFuture<'a, Response> {
        cx.record_error(self.0.clone());
        let status = self.0.status();
        Box::pin(async move { Response::status(status) })
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// A built router: composed chains plus the base logger service.
pub struct App {
    routes: HashMap<Method, MatchitRouter<Arc<dyn Endpoint>>>,
    /// Global stages over a `404 not_found` terminal.
    fallback: Arc<dyn Endpoint>,
    /// Global stages over a `400 invalid_body` terminal.
    unreadable: Arc<dyn Endpoint>,
    log: LogService,
}

impl App {
    /// The base logger service; see [`LogService::replace`] for test isolation.
    pub fn log_service(&self) -> &LogService { &self.log }

    /// Runs one request through its chain and returns the final response.
    ///
    /// Headers staged in the context (`X-Request-ID`, CORS) are applied to
    /// whatever response the chain ended with.
    pub async fn call<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let _in_flight = self.log.track();
        let base = self.log.current();
        let dispatch = base.dispatch().clone();
        self.respond(req, base).with_subscriber(dispatch).await
    }

    async fn respond<B>(&self, req: http::Request<B>, base: Logger) -> http::Response<Full<Bytes>>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let (body, readable) = match body.collect().await {
            Ok(collected) => (collected.to_bytes(), true),
            Err(e) => {
                base.in_scope(|| warn!(path = %parts.uri.path(), "failed to read request body: {e}"));
                (Bytes::new(), false)
            }
        };

        let mut cx = Context::new(base.clone());
        let mut req = Request::new(parts, body, base);
        let endpoint = if !readable {
            Arc::clone(&self.unreadable)
        } else if let Some((endpoint, params)) = self.lookup(&req.method, req.uri.path()) {
            req.params = params;
            endpoint
        } else {
            Arc::clone(&self.fallback)
        };

        let mut res = endpoint.call(req, &mut cx).await;
        res.headers_mut().extend(cx.take_response_headers());
        res.into_inner()
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(Arc<dyn Endpoint>, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let endpoint = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((endpoint, params))
    }
}
