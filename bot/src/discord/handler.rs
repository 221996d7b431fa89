use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{Context, EventHandler, Guild, GuildChannel, Message, Ready, UnavailableGuild};
use tracing::{debug, info};

use super::convert::{guild_snapshot, inbound_message};
use crate::commands::dispatcher::Dispatcher;
use crate::engine::model::{ChannelId, GuildId};

/// Forwards gateway events to the dispatcher.
pub struct Handler {
    dispatcher: Arc<Dispatcher>,
}

impl Handler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "connected to discord"
        );
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        self.dispatcher.handle_guild_available(&guild_snapshot(&guild));
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        // An outage also arrives as a delete, with `unavailable` set.
        if incomplete.unavailable {
            debug!(guild_id = %incomplete.id, "guild became unavailable");
            return;
        }
        self.dispatcher
            .handle_guild_removed(GuildId(incomplete.id.get()));
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        self.dispatcher
            .handle_channel_deleted(GuildId(channel.guild_id.get()), ChannelId(channel.id.get()))
            .await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        self.dispatcher.spawn(inbound_message(&msg));
    }
}
