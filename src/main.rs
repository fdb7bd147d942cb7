use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vidsniff::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting vidsniff v{}", env!("CARGO_PKG_VERSION"));

    cli.run().await?;

    Ok(())
}
