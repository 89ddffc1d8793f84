use std::path::PathBuf;

use clap::Parser;
use toolkit_api::ServerConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "toolkit-server")]
#[command(about = "HTTP backend for the developer toolkit")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./toolkit.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;

    toolkit_api::serve(config).await
}
