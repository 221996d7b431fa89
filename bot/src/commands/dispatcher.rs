use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::parser::{Command, CommandParser};
use super::utility;
use crate::config::BotConfig;
use crate::engine::escalation::{EscalationManager, ResolveOutcome};
use crate::engine::guild::{ChannelSide, EscalationCase};
use crate::engine::guild_store::GuildStore;
use crate::engine::model::{ChannelId, GuildId, GuildSnapshot, InboundMessage};
use crate::error::BotError;
use crate::platform::ChatPlatform;

/// Routes platform events to the escalation manager and the utility
/// commands. Nothing returned by a handler escapes past here: failures are
/// reported to the user or logged.
pub struct Dispatcher {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<GuildStore>,
    escalation: EscalationManager,
    parser: CommandParser,
    prefix: String,
    count_history_limit: usize,
}

impl Dispatcher {
    pub fn new(platform: Arc<dyn ChatPlatform>, config: &BotConfig) -> Self {
        let store = Arc::new(GuildStore::new(config.admin_lookup()));
        let escalation =
            EscalationManager::new(platform.clone(), store.clone(), config.escalation_settings());
        Self {
            platform,
            store,
            escalation,
            parser: config.parser(),
            prefix: config.bot.prefix.clone(),
            count_history_limit: config.commands.count_history_limit,
        }
    }

    pub fn store(&self) -> &GuildStore {
        &self.store
    }

    // ── Guild events ────────────────────────────────────────────────

    pub fn handle_guild_available(&self, snapshot: &GuildSnapshot) {
        self.store.init_guild(snapshot);
    }

    pub fn handle_guild_removed(&self, guild_id: GuildId) {
        if self.store.forget_guild(guild_id) {
            info!(%guild_id, "guild removed");
        }
    }

    pub async fn handle_channel_deleted(&self, guild_id: GuildId, channel: ChannelId) {
        self.escalation.abandon_channel(guild_id, channel).await;
    }

    // ── Messages ────────────────────────────────────────────────────

    /// Handle `msg` on its own task so slow commands do not hold up others.
    pub fn spawn(self: &Arc<Self>, msg: InboundMessage) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.handle_message(msg).await })
    }

    pub async fn handle_message(&self, msg: InboundMessage) {
        if msg.author.bot || msg.author.id == self.platform.bot_user() {
            return;
        }

        if let Some(guild_id) = msg.guild_id
            && let Some((case, side)) = self.store.find_case_by_channel(guild_id, msg.channel_id)
        {
            self.handle_case_message(&msg, &case, side).await;
            return;
        }

        let Some(line) = self.strip_prefix(&msg.content) else {
            return;
        };
        let result = match self.parser.parse(line) {
            Ok(command) => self.run(command, &msg).await,
            Err(failure) => Err(BotError::Parse(failure)),
        };
        if let Err(e) = result {
            self.report(&msg, e).await;
        }
    }

    async fn run(&self, command: Command, msg: &InboundMessage) -> Result<(), BotError> {
        debug!(
            command = command.name(),
            user = %msg.author.id,
            channel = %msg.channel_id,
            "running command"
        );
        match command {
            Command::Count => {
                utility::count(self.platform.as_ref(), msg, self.count_history_limit).await?;
            }
            Command::Sleep { seconds } => {
                utility::sleep(self.platform.as_ref(), msg, Duration::from_secs(seconds)).await?;
            }
            Command::Summon => {
                self.escalation.summon(msg).await?;
            }
            Command::Resolve => {
                self.resolve(msg).await?;
            }
            Command::Admin { message } => {
                self.escalation.notify_admins(msg, message.as_deref()).await?;
            }
        }
        Ok(())
    }

    /// Traffic inside an open case. Only `resolve` is honoured as a command
    /// here; other prefixed text on the admin side is relayed to the user.
    async fn handle_case_message(
        &self,
        msg: &InboundMessage,
        case: &EscalationCase,
        side: ChannelSide,
    ) {
        let line = self.strip_prefix(&msg.content);
        let wants_resolve =
            line.is_some_and(|line| matches!(self.parser.parse(line), Ok(Command::Resolve)));

        let result = match side {
            ChannelSide::User => {
                let mirrored = self.escalation.mirror(msg, case).await.map(|_| ());
                if wants_resolve {
                    if let Err(e) = mirrored {
                        self.report(msg, e).await;
                    }
                    self.resolve(msg).await
                } else {
                    mirrored
                }
            }
            ChannelSide::Admin => match line.map(str::trim) {
                Some(_) if wants_resolve => self.resolve(msg).await,
                Some("") | None => Ok(()),
                Some(text) => self.escalation.relay_admin_reply(case, text).await,
            },
            ChannelSide::Shared if wants_resolve => self.resolve(msg).await,
            ChannelSide::Shared => Ok(()),
        };
        if let Err(e) = result {
            self.report(msg, e).await;
        }
    }

    async fn resolve(&self, msg: &InboundMessage) -> Result<(), BotError> {
        if self.escalation.resolve(msg).await? == ResolveOutcome::NotACase {
            debug!(channel = %msg.channel_id, "resolve outside an escalation channel ignored");
        }
        Ok(())
    }

    /// Text after exactly one leading prefix, if the message has one.
    fn strip_prefix<'a>(&self, content: &'a str) -> Option<&'a str> {
        content.strip_prefix(self.prefix.as_str())
    }

    async fn report(&self, msg: &InboundMessage, err: BotError) {
        match err {
            BotError::Platform(e) => {
                error!(
                    user = %msg.author.id,
                    channel = %msg.channel_id,
                    error = %e,
                    "command failed on the platform"
                );
            }
            BotError::Unauthorized => {
                let text = format!("{} {}", msg.author.id.mention(), BotError::Unauthorized);
                if let Err(e) = self.platform.send_message(msg.channel_id, &text).await {
                    warn!(
                        channel = %msg.channel_id,
                        error = %e,
                        "failed to report unauthorized resolve"
                    );
                }
            }
            other => {
                if let Err(e) = self.platform.send_direct(msg.author.id, &other.to_string()).await {
                    warn!(user = %msg.author.id, error = %e, "failed to send error to user");
                }
            }
        }
    }
}
