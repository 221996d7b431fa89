use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    ChannelId as SerenityChannelId, ChannelType, CreateChannel, EditMessage, GetMessages,
    GuildId as SerenityGuildId, Http, MessageId as SerenityMessageId, RoleId as SerenityRoleId,
    UserId as SerenityUserId,
};

use super::convert::{overwrite_from_serenity, overwrite_to_serenity, permissions, platform_error};
use crate::engine::model::{ChannelId, GuildId, MessageId, MessageRef, RecentMessage, RoleId, UserId};
use crate::engine::permissions::{ChannelOverride, Permissions, compute_effective_permissions};
use crate::engine::validation::MAX_HISTORY_FETCH;
use crate::platform::{ChatPlatform, PlatformError};

/// [`ChatPlatform`] over serenity's REST client.
pub struct SerenityPlatform {
    http: Arc<Http>,
    bot: UserId,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>, bot: UserId) -> Self {
        Self { http, bot }
    }
}

fn channel(id: ChannelId) -> SerenityChannelId {
    SerenityChannelId::new(id.get())
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    fn bot_user(&self) -> UserId {
        self.bot
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        text: &str,
    ) -> Result<MessageRef, PlatformError> {
        let sent = channel(channel_id)
            .say(&*self.http, text)
            .await
            .map_err(platform_error)?;
        Ok(MessageRef {
            channel_id,
            message_id: MessageId(sent.id.get()),
        })
    }

    async fn send_direct(&self, user: UserId, text: &str) -> Result<MessageRef, PlatformError> {
        let dm = SerenityUserId::new(user.get())
            .create_dm_channel(&*self.http)
            .await
            .map_err(platform_error)?;
        let sent = dm.id.say(&*self.http, text).await.map_err(platform_error)?;
        Ok(MessageRef {
            channel_id: ChannelId(dm.id.get()),
            message_id: MessageId(sent.id.get()),
        })
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<(), PlatformError> {
        channel(message.channel_id)
            .edit_message(
                &*self.http,
                SerenityMessageId::new(message.message_id.get()),
                EditMessage::new().content(text),
            )
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError> {
        channel(message.channel_id)
            .delete_message(&*self.http, SerenityMessageId::new(message.message_id.get()))
            .await
            .map_err(platform_error)
    }

    async fn create_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: &[ChannelOverride],
    ) -> Result<ChannelId, PlatformError> {
        let builder = CreateChannel::new(name)
            .kind(ChannelType::Text)
            .permissions(overwrites.iter().map(overwrite_to_serenity));
        let created = SerenityGuildId::new(guild.get())
            .create_channel(&*self.http, builder)
            .await
            .map_err(platform_error)?;
        Ok(ChannelId(created.id.get()))
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<(), PlatformError> {
        channel(channel_id)
            .delete(&*self.http)
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: ChannelId,
        limit: usize,
        author: Option<UserId>,
    ) -> Result<Vec<RecentMessage>, PlatformError> {
        let limit = u8::try_from(limit.min(MAX_HISTORY_FETCH)).unwrap_or(u8::MAX);
        let messages = channel(channel_id)
            .messages(&*self.http, GetMessages::new().limit(limit))
            .await
            .map_err(platform_error)?;
        Ok(messages
            .into_iter()
            .map(|m| RecentMessage {
                id: MessageId(m.id.get()),
                author: UserId(m.author.id.get()),
            })
            .filter(|m| author.is_none_or(|a| m.author == a))
            .collect())
    }

    async fn is_administrator(
        &self,
        guild: GuildId,
        channel_id: ChannelId,
        user: UserId,
    ) -> Result<bool, PlatformError> {
        let guild_id = SerenityGuildId::new(guild.get());
        let user_id = SerenityUserId::new(user.get());

        let partial = guild_id
            .to_partial_guild(&*self.http)
            .await
            .map_err(platform_error)?;
        let member = guild_id
            .member(&*self.http, user_id)
            .await
            .map_err(platform_error)?;
        let Some(guild_channel) = channel(channel_id)
            .to_channel(&*self.http)
            .await
            .map_err(platform_error)?
            .guild()
        else {
            return Ok(false);
        };

        let everyone_role = RoleId(guild.get());
        let base_everyone = partial
            .roles
            .get(&SerenityRoleId::new(guild.get()))
            .map(|role| permissions(role.permissions))
            .unwrap_or_else(Permissions::empty);
        let member_roles: Vec<(RoleId, Permissions)> = member
            .roles
            .iter()
            .filter_map(|id| {
                partial
                    .roles
                    .get(id)
                    .map(|role| (RoleId(id.get()), permissions(role.permissions)))
            })
            .collect();
        let overrides: Vec<ChannelOverride> = guild_channel
            .permission_overwrites
            .iter()
            .filter_map(overwrite_from_serenity)
            .collect();

        let effective = compute_effective_permissions(
            base_everyone,
            &member_roles,
            &overrides,
            everyone_role,
            user,
            partial.owner_id == user_id,
        );
        Ok(effective.contains(Permissions::ADMINISTRATOR))
    }
}
