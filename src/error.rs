//! Infrastructure error type.

use thiserror::Error;

/// The error type returned by alchemorsel's fallible setup and serving
/// operations.
///
/// Request-level failures (404, 422, a handler giving up) are never `Error`s:
/// they travel as [`ApiError`](crate::ApiError) or any other error value on
/// the request's error list and are rendered by
/// [`ErrorResponder`](crate::middleware::ErrorResponder). This type covers
/// what can go wrong before or around request handling: binding, accepting,
/// route registration, configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("invalid route `{path}`: {source}")]
    Route {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("invalid log filter `{filter}`: {source}")]
    LogFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// The base logger cannot be swapped while requests are being served.
    #[error("base logger is in use by {in_flight} in-flight request(s)")]
    LoggerInUse { in_flight: usize },
}
