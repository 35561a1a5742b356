//! # alchemorsel
//!
//! The HTTP request pipeline of the alchemorsel recipe API.
//!
//! Every request runs through a fixed chain of stages before it reaches a
//! handler:
//!
//! ```text
//! Recovery → ErrorResponder → RequestId → Logging → Cors → [Auth] → handler
//! ```
//!
//! - **Recovery** turns a panic anywhere below it into a 500 and keeps the
//!   server running.
//! - **ErrorResponder** renders the last error recorded for the request as
//!   a JSON envelope (`{"error": code, "message": ...}`).
//! - **RequestId** assigns a correlation id, echoes it as `X-Request-ID` and
//!   derives a request-scoped logger carrying it.
//! - **Logging** writes one access-log record per request.
//! - **Cors** adds `Access-Control-Allow-Origin` and answers preflights.
//! - **Auth** (protected groups only) exposes the caller's credential.
//!
//! There is no global logger: a base [`Logger`] is injected once at startup
//! and every request starts from it.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use alchemorsel::{ApiError, Json, Logger, Request, Router, Server};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = Router::standard()
//!         .get("/recipes/{id}", get_recipe);
//!
//!     Server::bind("0.0.0.0:8080")?
//!         .logger(Logger::from_subscriber(tracing_subscriber::fmt().json().finish()))
//!         .serve(app)
//!         .await?;
//!     Ok(())
//! }
//!
//! async fn get_recipe(req: Request) -> Result<Json<Value>, ApiError> {
//!     match req.param("id") {
//!         Some("42") => Ok(Json(json!({"id": 42, "title": "Shakshuka"}))),
//!         _ => Err(ApiError::NOT_FOUND),
//!     }
//! }
//! ```

mod api_error;
mod config;
mod context;
mod error;
mod handler;
mod logger;
mod request;
mod response;
mod router;
mod server;

pub mod api;
pub mod health;
pub mod middleware;

pub use api_error::ApiError;
pub use config::{Config, LogFormat};
pub use context::{Context, CorrelationId, Credential};
pub use error::Error;
pub use handler::Handler;
pub use logger::{LogService, Logger};
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::{App, Group, Router};
pub use server::Server;
