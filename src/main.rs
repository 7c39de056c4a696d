use clap::Parser;
use tracing_subscriber::EnvFilter;

use doka_api::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up API_SECRET, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("doka_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = doka_api::cli::run(cli).await {
        tracing::error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
