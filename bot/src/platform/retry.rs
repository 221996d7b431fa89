use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{ChatPlatform, PlatformError};
use crate::engine::model::{ChannelId, GuildId, MessageRef, RecentMessage, UserId};
use crate::engine::permissions::ChannelOverride;

/// Upper bound for the pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(8);
const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Wraps a platform so every call is bounded by a timeout. Idempotent calls
/// (edit, delete, fetch, permission query) are retried with exponential
/// backoff on transient failures; sends and channel creation are not, since
/// a timed-out attempt may still have gone through.
pub struct RetryingPlatform {
    inner: Arc<dyn ChatPlatform>,
    call_timeout: Duration,
    max_retries: u32,
}

impl RetryingPlatform {
    pub fn new(inner: Arc<dyn ChatPlatform>, call_timeout: Duration, max_retries: u32) -> Self {
        Self {
            inner,
            call_timeout,
            max_retries,
        }
    }

    async fn bounded<T, F, Fut>(
        &self,
        op: &'static str,
        idempotent: bool,
        mut call: F,
    ) -> Result<T, PlatformError>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, PlatformError>> + Send,
    {
        let attempts = if idempotent { self.max_retries + 1 } else { 1 };
        let mut backoff = BASE_BACKOFF;
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(PlatformError::Timeout),
            };

            match result {
                Err(e) if attempt < attempts && e.is_transient() => {
                    warn!(op, attempt, error = %e, "platform call failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl ChatPlatform for RetryingPlatform {
    fn bot_user(&self) -> UserId {
        self.inner.bot_user()
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageRef, PlatformError> {
        self.bounded("send_message", false, move || self.inner.send_message(channel, text))
            .await
    }

    async fn send_direct(&self, user: UserId, text: &str) -> Result<MessageRef, PlatformError> {
        self.bounded("send_direct", false, move || self.inner.send_direct(user, text))
            .await
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<(), PlatformError> {
        self.bounded("edit_message", true, move || self.inner.edit_message(message, text))
            .await
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError> {
        self.bounded("delete_message", true, move || self.inner.delete_message(message))
            .await
    }

    async fn create_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: &[ChannelOverride],
    ) -> Result<ChannelId, PlatformError> {
        self.bounded("create_channel", false, move || {
            self.inner.create_channel(guild, name, overwrites)
        })
        .await
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        self.bounded("delete_channel", true, move || self.inner.delete_channel(channel))
            .await
    }

    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
        author: Option<UserId>,
    ) -> Result<Vec<RecentMessage>, PlatformError> {
        self.bounded("fetch_recent_messages", true, move || {
            self.inner.fetch_recent_messages(channel, limit, author)
        })
        .await
    }

    async fn is_administrator(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<bool, PlatformError> {
        self.bounded("is_administrator", true, move || {
            self.inner.is_administrator(guild, channel, user)
        })
        .await
    }
}
