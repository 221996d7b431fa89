use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use super::model::{ChannelId, ChannelSnapshot, GuildId, GuildSnapshot, RoleId, RoleSnapshot, UserId};
use super::permissions::Permissions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Open,
    Resolved,
}

/// Which part of a case a channel is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSide {
    /// The requester's side of a mirrored pair.
    User,
    /// The admins' side of a mirrored pair.
    Admin,
    /// The single channel of the shared layout.
    Shared,
}

/// One open support case: the private channel(s) a member opened to talk
/// to the admins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationCase {
    pub id: Uuid,
    pub guild_id: GuildId,
    pub requester: UserId,
    pub user_channel: ChannelId,
    /// None when the case uses a single shared channel.
    pub admin_channel: Option<ChannelId>,
    pub state: CaseState,
    pub opened_at: DateTime<Utc>,
}

impl EscalationCase {
    pub fn new(
        guild_id: GuildId,
        requester: UserId,
        user_channel: ChannelId,
        admin_channel: Option<ChannelId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            requester,
            user_channel,
            admin_channel,
            state: CaseState::Open,
            opened_at: Utc::now(),
        }
    }

    pub fn side_of(&self, channel: ChannelId) -> Option<ChannelSide> {
        if channel == self.user_channel {
            Some(if self.admin_channel.is_some() {
                ChannelSide::User
            } else {
                ChannelSide::Shared
            })
        } else if Some(channel) == self.admin_channel {
            Some(ChannelSide::Admin)
        } else {
            None
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        std::iter::once(self.user_channel).chain(self.admin_channel)
    }
}

/// How the admin role of a guild is picked from its role list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminRoleRule {
    /// The role whose name matches the configured admin role name.
    #[default]
    Named,
    /// The first non-managed role holding ADMINISTRATOR.
    FirstAdministrator,
}

/// Names and rules used to find the admin channel and role of a guild.
#[derive(Debug, Clone)]
pub struct AdminLookup {
    pub channel_name: String,
    pub role_rule: AdminRoleRule,
    pub role_name: String,
}

impl Default for AdminLookup {
    fn default() -> Self {
        Self {
            channel_name: "admins".into(),
            role_rule: AdminRoleRule::Named,
            role_name: "admins".into(),
        }
    }
}

impl AdminLookup {
    pub fn admin_channel(&self, channels: &[ChannelSnapshot]) -> Option<ChannelId> {
        channels
            .iter()
            .find(|ch| ch.name == self.channel_name)
            .map(|ch| ch.id)
    }

    pub fn admin_role(&self, roles: &[RoleSnapshot], everyone_role: RoleId) -> Option<RoleId> {
        match self.role_rule {
            AdminRoleRule::Named => roles
                .iter()
                .find(|role| role.name == self.role_name)
                .map(|role| role.id),
            AdminRoleRule::FirstAdministrator => {
                let mut candidates = roles.iter().filter(|role| {
                    role.id != everyone_role
                        && !role.managed
                        && role.permissions.contains(Permissions::ADMINISTRATOR)
                });
                let first = candidates.next()?;
                let others: Vec<&str> = candidates.map(|role| role.name.as_str()).collect();
                if !others.is_empty() {
                    warn!(
                        chosen = %first.name,
                        ignored = ?others,
                        "several administrator roles found, using the first"
                    );
                }
                Some(first.id)
            }
        }
    }
}

/// In-memory state for a guild.
#[derive(Debug)]
pub struct GuildState {
    pub id: GuildId,
    pub name: String,
    pub everyone_role: RoleId,
    pub admin_channel: Option<ChannelId>,
    pub admin_role: Option<RoleId>,
    /// Open cases, oldest first.
    pub cases: Vec<EscalationCase>,
}

impl GuildState {
    pub fn from_snapshot(snapshot: &GuildSnapshot, lookup: &AdminLookup) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name.clone(),
            everyone_role: snapshot.everyone_role,
            admin_channel: lookup.admin_channel(&snapshot.channels),
            admin_role: lookup.admin_role(&snapshot.roles, snapshot.everyone_role),
            cases: Vec::new(),
        }
    }

    pub fn find_case(&self, channel: ChannelId) -> Option<(&EscalationCase, ChannelSide)> {
        self.cases
            .iter()
            .find_map(|case| case.side_of(channel).map(|side| (case, side)))
    }
}
