use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use adminbridge::config::BotConfig;

/// Private escalation channels between guild members and their admins.
#[derive(Parser)]
#[command(name = "adminbridge", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "adminbridge.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = BotConfig::load(&cli.config)?;

    info!(
        prefix = %config.bot.prefix,
        layout = ?config.escalation.layout,
        resolve_policy = ?config.escalation.resolve_policy,
        "adminbridge starting"
    );

    adminbridge::discord::run(config).await
}
