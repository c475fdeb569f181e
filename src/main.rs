//! homeflow CLI entrypoint

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use homeflow::cli::Cli;
use homeflow::config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::config()?;

    // RUST_LOG wins over the configured level
    let directive = config::level_directive(&settings.log_level);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive.unwrap_or("info"))),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if directive.is_none() {
        warn!(
            level = %settings.log_level,
            "Unknown log level in settings, using info"
        );
    }

    cli.execute(settings).await
}
