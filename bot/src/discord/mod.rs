//! Discord adapter: serenity client setup, event forwarding, and the
//! [`ChatPlatform`](crate::platform::ChatPlatform) implementation.

mod convert;
mod handler;
mod platform;

use std::sync::Arc;

use anyhow::{Context as _, bail};
use serenity::all::{Client, GatewayIntents, Http};
use tracing::info;

pub use handler::Handler;
pub use platform::SerenityPlatform;

use crate::commands::dispatcher::Dispatcher;
use crate::config::BotConfig;
use crate::engine::model::UserId;
use crate::platform::ChatPlatform;
use crate::platform::retry::RetryingPlatform;

/// Connect to Discord and handle events until the gateway shuts down or
/// Ctrl-C is received.
pub async fn run(config: BotConfig) -> anyhow::Result<()> {
    let token = config.bot.token.trim().to_string();
    if token.is_empty() {
        bail!("no bot token configured (set DISCORD_TOKEN or bot.token)");
    }

    let http = Arc::new(Http::new(&token));
    let me = http
        .get_current_user()
        .await
        .context("failed to fetch the bot user, is the token valid?")?;
    info!(bot = %me.name, id = %me.id, "authenticated");

    let adapter: Arc<dyn ChatPlatform> =
        Arc::new(SerenityPlatform::new(http, UserId(me.id.get())));
    let platform: Arc<dyn ChatPlatform> = Arc::new(RetryingPlatform::new(
        adapter,
        config.call_timeout(),
        config.platform.max_retries,
    ));
    let dispatcher = Arc::new(Dispatcher::new(platform, &config));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler::new(dispatcher))
        .await
        .context("failed to build the discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.context("discord client stopped")?;
    Ok(())
}
