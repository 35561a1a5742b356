//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Stopping `listener.accept()`; no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Error;
use crate::logger::Logger;
use crate::router::{App, Router};

enum Binding {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
///
/// Every request is handed to the [`App`] built from the router; the
/// server itself only accepts connections and speaks HTTP. Its own events
/// (listening, accept errors, shutdown) go through the injected [`Logger`],
/// which also becomes the base logger of every request.
pub struct Server {
    binding: Binding,
    logger: Logger,
    read_timeout: Option<Duration>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use alchemorsel::Server;
    /// let server = Server::bind("0.0.0.0:8080").unwrap();
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let parsed = addr.parse().map_err(|source| Error::InvalidAddress { addr: addr.to_owned(), source })?;
        Ok(Self::with_binding(Binding::Addr(parsed)))
    }

    /// Serves on an already bound listener, e.g. `127.0.0.1:0` in tests.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self::with_binding(Binding::Listener(listener))
    }

    /// Address and read timeout from `config`. The logger is left disabled;
    /// set it with [`Server::logger`].
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::with_binding(Binding::Addr(config.addr()?)).read_timeout(config.read_timeout()))
    }

    fn with_binding(binding: Binding) -> Self {
        Self { binding, logger: Logger::disabled(), read_timeout: None }
    }

    #[must_use]
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Maximum time a client may take to send the request headers (HTTP/1).
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let signal = shutdown_signal(self.logger.clone());
        self.serve_with_shutdown(router, signal).await
    }

    /// Serves `router` until `signal` resolves, then drains.
    ///
    /// Returns only after every in-flight connection has finished.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let app = Arc::new(router.into_app(self.logger.clone())?);
        let listener = match self.binding {
            Binding::Addr(addr) => TcpListener::bind(addr).await?,
            Binding::Listener(listener) => listener,
        };
        let log = &self.logger;

        let mut conn = ConnBuilder::new(TokioExecutor::new());
        conn.http1().timer(TokioTimer::new());
        if let Some(timeout) = self.read_timeout {
            conn.http1().header_read_timeout(timeout);
        }

        let addr = listener.local_addr()?;
        log.in_scope(|| info!(%addr, "alchemorsel listening"));

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Checked first: a shutdown stops accepting even with a backlog.
                biased;

                () = &mut signal => {
                    log.in_scope(|| info!(in_flight = tasks.len(), "shutdown signal received, draining connections"));
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            log.in_scope(|| error!("accept error: {e}"));
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let conn = conn.clone();
                    let log = log.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { Ok::<_, Infallible>(app.call(req).await) }
                        });

                        if let Err(e) = conn.serve_connection(io, svc).await {
                            log.in_scope(|| error!(%peer, "connection error: {e}"));
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        log.in_scope(|| info!("alchemorsel stopped"));
        Ok(())
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C.
///
/// A signal that cannot be listened for is logged and never fires; the other
/// one still works.
async fn shutdown_signal(logger: Logger) {
    let logger = &logger;

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            logger.in_scope(|| error!("failed to install Ctrl-C handler: {e}"));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                logger.in_scope(|| error!("failed to install SIGTERM handler: {e}"));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}
