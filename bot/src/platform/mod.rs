//! The chat platform as the bot sees it. The Discord adapter implements
//! [`ChatPlatform`] over serenity; [`retry::RetryingPlatform`] bounds every
//! call with a timeout.

pub mod retry;

use async_trait::async_trait;

use crate::engine::model::{ChannelId, GuildId, MessageRef, RecentMessage, UserId};
use crate::engine::permissions::ChannelOverride;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The target (message, channel, member) no longer exists.
    NotFound,
    /// The bot lacks the permission for this call.
    Forbidden,
    /// The call did not complete in time.
    Timeout,
    Api(String),
}

impl PlatformError {
    /// Worth retrying: the same call might succeed a moment later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Api(_))
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::NotFound => write!(f, "not found"),
            PlatformError::Forbidden => write!(f, "missing permissions"),
            PlatformError::Timeout => write!(f, "timed out"),
            PlatformError::Api(msg) => write!(f, "api error: {msg}"),
        }
    }
}

impl std::error::Error for PlatformError {}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The bot's own account.
    fn bot_user(&self) -> UserId;

    async fn send_message(&self, channel: ChannelId, text: &str)
    -> Result<MessageRef, PlatformError>;

    /// Send a private message to a user.
    async fn send_direct(&self, user: UserId, text: &str) -> Result<MessageRef, PlatformError>;

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<(), PlatformError>;

    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError>;

    async fn create_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: &[ChannelOverride],
    ) -> Result<ChannelId, PlatformError>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;

    /// Up to `limit` most recent messages of a channel, optionally only
    /// those written by `author`.
    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
        author: Option<UserId>,
    ) -> Result<Vec<RecentMessage>, PlatformError>;

    /// Whether `user` holds ADMINISTRATOR in `channel`.
    async fn is_administrator(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<bool, PlatformError>;
}
