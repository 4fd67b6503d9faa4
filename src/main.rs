use anyhow::Context;
use tracing::info;

use bookshelf_api::config::Config;
use bookshelf_api::lifecycle::{shutdown_signal, Lifecycle, Shutdown};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loads `.env` first so RUST_LOG can come from there too.
    let config = Config::from_env().context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let app = bookshelf_api::bootstrap(&config).await?;

    let lifecycle = Lifecycle::new(config.shutdown_timeout());
    match lifecycle
        .run(config.bind_addr(), app, shutdown_signal())
        .await?
    {
        Shutdown::Drained => info!("Server stopped"),
        Shutdown::TimedOut => info!("Server stopped with connections still open"),
    }

    Ok(())
}
