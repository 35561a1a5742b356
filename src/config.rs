//! Process configuration.
//!
//! Every setting is a CLI flag with an environment-variable fallback, so the
//! binary runs unchanged under docker-compose (`APP_PORT=...`) or from a
//! shell (`--port ...`).

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::Error;

/// Output format of the base logger.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output for local development.
    Pretty,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "alchemorsel", version, about = "alchemorsel recipe API server")]
pub struct Config {
    /// Interface to bind.
    #[arg(long, env = "APP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "APP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds a client may take to send request headers.
    #[arg(long = "read-timeout-secs", env = "APP_READ_TIMEOUT_SECS", default_value_t = 5)]
    pub read_timeout_secs: u64,

    /// `tracing` filter directives, e.g. `info` or `alchemorsel=debug,hyper=warn`.
    #[arg(long, env = "APP_LOG", default_value = "info")]
    pub log_filter: String,

    #[arg(long, env = "APP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Value of `Access-Control-Allow-Origin`.
    #[arg(long, env = "APP_CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,
}

impl Config {
    /// Socket address built from `host` and `port`.
    pub fn addr(&self) -> Result<SocketAddr, Error> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|source| Error::InvalidAddress { addr, source })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            read_timeout_secs: 5,
            log_filter: "info".to_owned(),
            log_format: LogFormat::Json,
            cors_origin: "*".to_owned(),
        }
    }
}
