//! Commands that touch no guild state.

use std::time::Duration;

use tracing::debug;

use crate::engine::model::InboundMessage;
use crate::error::BotError;
use crate::platform::ChatPlatform;

/// Reply with how many of the last `history_limit` messages in the channel
/// were written by the invoker. The placeholder reply is edited in place.
pub async fn count(
    platform: &dyn ChatPlatform,
    msg: &InboundMessage,
    history_limit: usize,
) -> Result<usize, BotError> {
    let placeholder = platform
        .send_message(msg.channel_id, "Calculating messages...")
        .await?;

    let recent = platform
        .fetch_recent_messages(msg.channel_id, history_limit, Some(msg.author.id))
        .await?;
    let total = recent
        .iter()
        .filter(|m| m.author == msg.author.id)
        .count();

    platform
        .edit_message(placeholder, &format!("You have {total} messages."))
        .await?;
    debug!(channel = %msg.channel_id, user = %msg.author.id, total, "counted messages");
    Ok(total)
}

/// Wait without blocking other handlers, then reply.
pub async fn sleep(
    platform: &dyn ChatPlatform,
    msg: &InboundMessage,
    duration: Duration,
) -> Result<(), BotError> {
    tokio::time::sleep(duration).await;
    platform.send_message(msg.channel_id, "Done sleeping").await?;
    Ok(())
}
