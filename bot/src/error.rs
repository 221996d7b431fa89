use crate::commands::parser::ParseFailure;
use crate::engine::model::ChannelId;
use crate::platform::PlatformError;

/// Guild setting a command needed but the guild does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSetting {
    AdminRole,
    AdminChannel,
    /// The guild has not been observed yet (or was just removed).
    GuildState,
}

/// Why a command did not complete. The `Display` text is what the invoking
/// user gets to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    Parse(ParseFailure),
    MissingConfiguration(MissingSetting),
    /// Guild-scoped command used in a direct message.
    GuildOnly,
    /// The requester already has an open case.
    CaseAlreadyOpen { channel: ChannelId },
    Unauthorized,
    Platform(PlatformError),
}

impl std::fmt::Display for BotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotError::Parse(failure) => write!(f, "{failure}"),
            BotError::MissingConfiguration(MissingSetting::AdminRole) => write!(
                f,
                "This server has no admin role set up, so a private channel cannot be opened."
            ),
            BotError::MissingConfiguration(MissingSetting::AdminChannel) => write!(
                f,
                "This server has no admin channel set up, so the admins cannot be notified."
            ),
            BotError::MissingConfiguration(MissingSetting::GuildState) => {
                write!(f, "This server is not ready yet, try again in a moment.")
            }
            BotError::GuildOnly => write!(f, "This command can only be used inside a server."),
            BotError::CaseAlreadyOpen { channel } => write!(
                f,
                "You already have an open channel with the admins: {}",
                channel.mention()
            ),
            BotError::Unauthorized => write!(f, "you are not allowed to resolve this channel."),
            BotError::Platform(e) => write!(f, "platform error: {e}"),
        }
    }
}

impl std::error::Error for BotError {}

impl From<ParseFailure> for BotError {
    fn from(failure: ParseFailure) -> Self {
        BotError::Parse(failure)
    }
}

impl From<PlatformError> for BotError {
    fn from(error: PlatformError) -> Self {
        BotError::Platform(error)
    }
}
