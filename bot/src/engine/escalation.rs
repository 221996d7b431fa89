use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::case_locks::CaseLocks;
use super::guild::{ChannelSide, EscalationCase};
use super::guild_store::GuildStore;
use super::model::{ChannelId, GuildId, InboundMessage, MessageRef, RoleId, UserId};
use super::overwrites::{BotVisibility, build_overwrites, case_grants};
use super::validation::{case_channel_name, split_message};
use crate::error::{BotError, MissingSetting};
use crate::platform::{ChatPlatform, PlatformError};

/// How many channels a case gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationLayout {
    /// A user side and an admin side, with user messages mirrored across.
    #[default]
    Paired,
    /// One channel both the requester and the admins can see.
    Shared,
}

/// Who may close a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvePolicy {
    /// Anyone who can post on the admin side (or in a shared channel).
    #[default]
    AdminSide,
    /// Only members holding ADMINISTRATOR in the channel.
    Administrators,
}

#[derive(Debug, Clone)]
pub struct EscalationSettings {
    pub layout: EscalationLayout,
    pub resolve_policy: ResolvePolicy,
    pub bot_visibility: BotVisibility,
    pub channel_suffix: String,
    pub admin_side_suffix: String,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            layout: EscalationLayout::Paired,
            resolve_policy: ResolvePolicy::AdminSide,
            bot_visibility: BotVisibility::Grant,
            channel_suffix: "talking-to-admins".into(),
            admin_side_suffix: "admin-side".into(),
        }
    }
}

/// Principals the overwrites of a new case are built from.
struct CaseRoles {
    guild_id: GuildId,
    requester: UserId,
    admin_role: RoleId,
    everyone_role: RoleId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The channel is not part of an open case.
    NotACase,
    Resolved(EscalationCase),
}

/// Opens, mirrors and closes escalation cases. All platform side effects of
/// a case go through here.
pub struct EscalationManager {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<GuildStore>,
    locks: CaseLocks,
    settings: EscalationSettings,
}

impl EscalationManager {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        store: Arc<GuildStore>,
        settings: EscalationSettings,
    ) -> Self {
        Self {
            platform,
            store,
            locks: CaseLocks::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &EscalationSettings {
        &self.settings
    }

    // ── Opening ─────────────────────────────────────────────────────

    /// Open a case for the author of `msg`.
    pub async fn summon(&self, msg: &InboundMessage) -> Result<EscalationCase, BotError> {
        let guild_id = msg.guild_id.ok_or(BotError::GuildOnly)?;

        let guard = self.locks.acquire(guild_id, msg.author.id).await;
        let opened = self.open_case(guild_id, msg).await;
        drop(guard);
        self.locks.prune();
        let (case, admin_role) = opened?;

        info!(
            case_id = %case.id,
            %guild_id,
            requester = %case.requester,
            user_channel = %case.user_channel,
            admin_channel = ?case.admin_channel,
            "escalation case opened"
        );

        self.discard_message(msg.reference()).await;
        self.acknowledge(&case, admin_role).await;
        Ok(case)
    }

    async fn open_case(
        &self,
        guild_id: GuildId,
        msg: &InboundMessage,
    ) -> Result<(EscalationCase, RoleId), BotError> {
        if !self.store.contains(guild_id) {
            return Err(BotError::MissingConfiguration(MissingSetting::GuildState));
        }
        let requester = msg.author.id;
        if let Some(existing) = self.store.open_case_for(guild_id, requester) {
            return Err(BotError::CaseAlreadyOpen {
                channel: existing.user_channel,
            });
        }
        let admin_role = self
            .store
            .admin_role(guild_id)
            .ok_or(BotError::MissingConfiguration(MissingSetting::AdminRole))?;
        let everyone_role = self
            .store
            .everyone_role(guild_id)
            .ok_or(BotError::MissingConfiguration(MissingSetting::GuildState))?;

        let roles = CaseRoles {
            guild_id,
            requester,
            admin_role,
            everyone_role,
        };
        let suffix = self.settings.channel_suffix.as_str();
        let case = match self.settings.layout {
            EscalationLayout::Shared => {
                let name = case_channel_name(&msg.author.name, &[suffix]);
                let channel = self
                    .create_side(&roles, &name, ChannelSide::Shared)
                    .await?;
                EscalationCase::new(guild_id, requester, channel, None)
            }
            EscalationLayout::Paired => {
                let user_name = case_channel_name(&msg.author.name, &[suffix]);
                let admin_name = case_channel_name(
                    &msg.author.name,
                    &[suffix, self.settings.admin_side_suffix.as_str()],
                );
                let user_channel = self
                    .create_side(&roles, &user_name, ChannelSide::User)
                    .await?;
                let admin_channel = match self
                    .create_side(&roles, &admin_name, ChannelSide::Admin)
                    .await
                {
                    Ok(channel) => channel,
                    Err(e) => {
                        warn!(%guild_id, error = %e, "admin side creation failed, rolling back");
                        self.discard_channel(user_channel).await;
                        return Err(e.into());
                    }
                };
                EscalationCase::new(guild_id, requester, user_channel, Some(admin_channel))
            }
        };

        if !self.store.record_case(case.clone()) {
            // Guild removed while the channels were being created.
            for channel in case.channels() {
                self.discard_channel(channel).await;
            }
            return Err(BotError::MissingConfiguration(MissingSetting::GuildState));
        }
        Ok((case, admin_role))
    }

    async fn create_side(
        &self,
        roles: &CaseRoles,
        name: &str,
        side: ChannelSide,
    ) -> Result<ChannelId, PlatformError> {
        let grants = case_grants(
            side,
            roles.requester,
            roles.admin_role,
            self.platform.bot_user(),
            self.settings.bot_visibility,
        );
        let overwrites = build_overwrites(roles.everyone_role, &grants);
        self.platform
            .create_channel(roles.guild_id, name, &overwrites)
            .await
    }

    async fn acknowledge(&self, case: &EscalationCase, admin_role: RoleId) {
        let requester = case.requester.mention();
        let notes = match case.admin_channel {
            Some(admin_channel) => vec![
                (
                    case.user_channel,
                    format!("{requester} you can talk to the admins here."),
                ),
                (
                    admin_channel,
                    format!(
                        "{requester} has opened a private channel with {}",
                        admin_role.mention()
                    ),
                ),
            ],
            None => vec![(
                case.user_channel,
                format!("{requester} you can talk to {} here.", admin_role.mention()),
            )],
        };
        for (channel, text) in notes {
            if let Err(e) = self.platform.send_message(channel, &text).await {
                warn!(case_id = %case.id, %channel, error = %e, "failed to acknowledge case");
            }
        }
    }

    // ── Traffic ─────────────────────────────────────────────────────

    /// Forward a user-side message to the admin side. Returns whether
    /// anything was sent.
    pub async fn mirror(
        &self,
        msg: &InboundMessage,
        case: &EscalationCase,
    ) -> Result<bool, BotError> {
        let Some(admin_channel) = case.admin_channel else {
            return Ok(false);
        };
        if msg.author.id == self.platform.bot_user() || msg.channel_id != case.user_channel {
            return Ok(false);
        }
        let text = format!("{}: {}", msg.author.id.mention(), msg.content);
        self.send_split(admin_channel, &text).await?;
        Ok(true)
    }

    /// Post an admin reply into the requester's side.
    pub async fn relay_admin_reply(
        &self,
        case: &EscalationCase,
        text: &str,
    ) -> Result<(), BotError> {
        self.send_split(case.user_channel, &format!("Admins: {text}"))
            .await
    }

    /// Tell the admin channel that someone asked for attention.
    pub async fn notify_admins(
        &self,
        msg: &InboundMessage,
        words: Option<&str>,
    ) -> Result<(), BotError> {
        let guild_id = msg.guild_id.ok_or(BotError::GuildOnly)?;
        if !self.store.contains(guild_id) {
            return Err(BotError::MissingConfiguration(MissingSetting::GuildState));
        }
        let admin_channel = self
            .store
            .admin_channel(guild_id)
            .ok_or(BotError::MissingConfiguration(MissingSetting::AdminChannel))?;

        let author = msg.author.id.mention();
        let origin = msg.channel_id.mention();
        let text = match words {
            Some(words) => format!("{author} in {origin} said: {words}"),
            None => format!("{author} mentioned admins in {origin}"),
        };
        self.send_split(admin_channel, &text).await?;

        self.discard_message(msg.reference()).await;
        Ok(())
    }

    /// Forwarded text can exceed one message once the author prefix is
    /// added, so it goes out in as many pieces as needed.
    async fn send_split(&self, channel: ChannelId, text: &str) -> Result<(), BotError> {
        for piece in split_message(text) {
            self.platform.send_message(channel, &piece).await?;
        }
        Ok(())
    }

    // ── Closing ─────────────────────────────────────────────────────

    /// Close the case owning the channel `msg` was posted in.
    pub async fn resolve(&self, msg: &InboundMessage) -> Result<ResolveOutcome, BotError> {
        let Some(guild_id) = msg.guild_id else {
            return Ok(ResolveOutcome::NotACase);
        };
        let Some((case, _)) = self.store.find_case_by_channel(guild_id, msg.channel_id) else {
            return Ok(ResolveOutcome::NotACase);
        };

        let guard = self.locks.acquire(guild_id, case.requester).await;
        let outcome = self.close_case(guild_id, msg).await;
        drop(guard);
        self.locks.prune();
        outcome
    }

    async fn close_case(
        &self,
        guild_id: GuildId,
        msg: &InboundMessage,
    ) -> Result<ResolveOutcome, BotError> {
        // Re-read under the lock: the case may have been closed meanwhile.
        let Some((case, side)) = self.store.find_case_by_channel(guild_id, msg.channel_id) else {
            return Ok(ResolveOutcome::NotACase);
        };
        self.authorize(guild_id, msg, side).await?;

        for channel in case.channels() {
            match self.platform.delete_channel(channel).await {
                Ok(()) | Err(PlatformError::NotFound) => {}
                Err(e) => {
                    warn!(
                        case_id = %case.id,
                        %channel,
                        error = %e,
                        "case channel deletion failed, case stays open"
                    );
                    return Err(e.into());
                }
            }
        }

        let Some(resolved) = self.store.remove_case(guild_id, case.id) else {
            return Ok(ResolveOutcome::NotACase);
        };
        info!(
            case_id = %resolved.id,
            %guild_id,
            resolved_by = %msg.author.id,
            "escalation case resolved"
        );
        Ok(ResolveOutcome::Resolved(resolved))
    }

    async fn authorize(
        &self,
        guild_id: GuildId,
        msg: &InboundMessage,
        side: ChannelSide,
    ) -> Result<(), BotError> {
        let allowed = match self.settings.resolve_policy {
            ResolvePolicy::AdminSide => side != ChannelSide::User,
            ResolvePolicy::Administrators => {
                self.platform
                    .is_administrator(guild_id, msg.channel_id, msg.author.id)
                    .await?
            }
        };
        if allowed {
            Ok(())
        } else {
            warn!(
                %guild_id,
                user = %msg.author.id,
                channel = %msg.channel_id,
                "unauthorized resolve attempt"
            );
            Err(BotError::Unauthorized)
        }
    }

    /// A case channel was deleted outside the bot. Drop the case and its
    /// remaining channel.
    pub async fn abandon_channel(
        &self,
        guild_id: GuildId,
        channel: ChannelId,
    ) -> Option<EscalationCase> {
        let (case, _) = self.store.find_case_by_channel(guild_id, channel)?;

        let guard = self.locks.acquire(guild_id, case.requester).await;
        let removed = self.store.remove_case(guild_id, case.id);
        drop(guard);
        self.locks.prune();

        let removed = removed?;
        for other in removed.channels().filter(|c| *c != channel) {
            self.discard_channel(other).await;
        }
        info!(
            case_id = %removed.id,
            %guild_id,
            %channel,
            "case channel deleted externally, case dropped"
        );
        Some(removed)
    }

    // ── Best-effort cleanup ─────────────────────────────────────────

    async fn discard_channel(&self, channel: ChannelId) {
        match self.platform.delete_channel(channel).await {
            Ok(()) | Err(PlatformError::NotFound) => {}
            Err(e) => warn!(%channel, error = %e, "failed to delete channel"),
        }
    }

    async fn discard_message(&self, message: MessageRef) {
        match self.platform.delete_message(message).await {
            Ok(()) | Err(PlatformError::NotFound) => {}
            Err(e) => warn!(channel = %message.channel_id, error = %e, "failed to delete message"),
        }
    }
}
