mod cli;
mod commands;
mod config;
mod context;
mod session;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Commands;
use crate::commands::*;
use crate::config::Config;
use crate::context::Context;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let command = match cli.command {
        Commands::Config { command } => return handle_config_command(command).await,
        other => other,
    };

    let mut config = Config::load().await?;
    if let Some(url) = cli.api_url {
        config.set_value("api.url", &url)?;
    }
    let ctx = Context::open(&config).await?;

    match command {
        Commands::Modules { command } => handle_module_command(command, &ctx).await,
        Commands::Install { id } => handle_install(id, &ctx).await,
        Commands::Uninstall { id } => handle_uninstall(id, &ctx).await,
        Commands::Installed => handle_installed(&ctx).await,
        Commands::Login { username, password } => handle_login(username, password, &ctx).await,
        Commands::Register {
            username,
            email,
            password,
        } => handle_register(username, email, password, &ctx).await,
        Commands::Logout => handle_logout(&ctx).await,
        Commands::Whoami => handle_whoami(&ctx).await,
        Commands::Config { command } => handle_config_command(command).await,
    }
}
