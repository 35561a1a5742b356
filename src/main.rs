use anyhow::Context as _;
use clap::Parser;
use tracing::info;

use alchemorsel::{Config, Logger, Server, api};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let logger = Logger::from_config(&config).context("building logger")?;

    logger.in_scope(|| info!(host = %config.host, port = config.port, "starting alchemorsel"));

    Server::from_config(&config)?
        .logger(logger)
        .serve(api::router(&config))
        .await
        .context("server failed")
}
