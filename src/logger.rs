//! Context-scoped logging.
//!
//! There is no global logger. A [`Logger`] is an explicit handle pairing a
//! tracing [`Dispatch`] (where events go) with a [`Span`] (which fixed fields
//! ride along). The process-wide base handle lives in a [`LogService`] that
//! is created once at startup and injected into the [`App`](crate::App);
//! every request starts from it and the request-id stage derives a child
//! carrying the correlation id.
//!
//! ```rust,no_run
//! use alchemorsel::Logger;
//!
//! let base = Logger::from_subscriber(tracing_subscriber::fmt().finish());
//! let child = base.child(|| tracing::info_span!("request", request_id = "abc"));
//! child.in_scope(|| tracing::info!("correlated"));
//! base.in_scope(|| tracing::info!("not correlated"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arc_swap::ArcSwap;
use tracing::{Dispatch, Span, Subscriber, dispatcher};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::error::Error;

/// An immutable, cheaply clonable logging handle.
///
/// Deriving a child never mutates the parent: both handles stay valid and
/// emit through the same dispatcher.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    span: Span,
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch, span: Span::none() }
    }

    pub fn from_subscriber<S>(subscriber: S) -> Self
    where
        S: Subscriber + Send + Sync + 'static,
    {
        Self::new(Dispatch::new(subscriber))
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self::new(Dispatch::none())
    }

    /// Builds the base logger described by `config`.
    ///
    /// The subscriber is wrapped in a [`Dispatch`] and handed back; it is
    /// never installed as the global default.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let filter = EnvFilter::try_new(&config.log_filter).map_err(|source| Error::LogFilter {
            filter: config.log_filter.clone(),
            source,
        })?;

        let dispatch = match config.log_format {
            LogFormat::Json => Dispatch::new(
                tracing_subscriber::fmt().json().with_env_filter(filter).finish(),
            ),
            LogFormat::Pretty => Dispatch::new(
                tracing_subscriber::fmt().pretty().with_env_filter(filter).finish(),
            ),
        };
        Ok(Self::new(dispatch))
    }

    /// Derives a child whose span is created under this logger's span.
    ///
    /// `make_span` runs inside this logger's scope, so a plain
    /// `tracing::info_span!` picks up the right dispatcher and parent.
    #[must_use]
    pub fn child(&self, make_span: impl FnOnce() -> Span) -> Self {
        let span = self.in_scope(make_span);
        Self { dispatch: self.dispatch.clone(), span }
    }

    /// Runs `f` with this logger's dispatcher as the default and its span
    /// entered. Use it around `tracing` macros.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, || self.span.in_scope(f))
    }

    pub fn dispatch(&self) -> &Dispatch { &self.dispatch }
    pub fn span(&self) -> &Span { &self.span }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("span", &self.span).finish_non_exhaustive()
    }
}

// ── Base logger service ───────────────────────────────────────────────────────

/// Holder of the process-wide base [`Logger`].
///
/// Created once at startup and shared by every request. [`replace`] exists
/// for test isolation: it refuses to swap while any request is in flight.
///
/// [`replace`]: LogService::replace
pub struct LogService {
    base: ArcSwap<Logger>,
    in_flight: AtomicUsize,
}

impl LogService {
    pub fn new(base: Logger) -> Self {
        Self { base: ArcSwap::from_pointee(base), in_flight: AtomicUsize::new(0) }
    }

    /// The current base logger.
    pub fn current(&self) -> Logger {
        Logger::clone(&self.base.load())
    }

    /// Swaps the base logger.
    ///
    /// Fails with [`Error::LoggerInUse`] while requests are being served;
    /// only call it from test setup, between requests.
    pub fn replace(&self, logger: Logger) -> Result<(), Error> {
        let in_flight = self.in_flight.load(Ordering::Acquire);
        if in_flight > 0 {
            return Err(Error::LoggerInUse { in_flight });
        }
        self.base.store(Arc::new(logger));
        Ok(())
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Marks one request as in flight until the guard drops.
    pub(crate) fn track(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlight(&self.in_flight)
    }
}

impl Default for LogService {
    fn default() -> Self { Self::new(Logger::disabled()) }
}

pub(crate) struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
