use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;
use uuid::Uuid;

use super::guild::{AdminLookup, CaseState, ChannelSide, EscalationCase, GuildState};
use super::model::{ChannelId, GuildId, GuildSnapshot, RoleId, UserId};

/// Per-guild escalation state. Rebuilt from platform snapshots on every
/// connect; nothing here outlives the process.
pub struct GuildStore {
    guilds: DashMap<GuildId, GuildState>,
    lookup: AdminLookup,
}

impl GuildStore {
    pub fn new(lookup: AdminLookup) -> Self {
        Self {
            guilds: DashMap::new(),
            lookup,
        }
    }

    /// Resolve the admin channel and role of a guild from its snapshot.
    /// On a reconnect, open cases whose channels still exist are kept. The
    /// entry is updated in place, so the guild never disappears from the map
    /// while case updates race with the reconnect.
    pub fn init_guild(&self, snapshot: &GuildSnapshot) {
        let mut fresh = GuildState::from_snapshot(snapshot, &self.lookup);

        let state = match self.guilds.entry(snapshot.id) {
            Entry::Occupied(entry) => {
                let mut state = entry.into_ref();
                fresh.cases = std::mem::take(&mut state.cases)
                    .into_iter()
                    .filter(|case| {
                        case.channels()
                            .all(|ch| snapshot.channels.iter().any(|c| c.id == ch))
                    })
                    .collect();
                *state = fresh;
                state
            }
            Entry::Vacant(entry) => entry.insert(fresh),
        };

        info!(
            guild_id = %state.id,
            guild = %state.name,
            admin_channel = ?state.admin_channel,
            admin_role = ?state.admin_role,
            open_cases = state.cases.len(),
            "guild initialized"
        );
    }

    pub fn forget_guild(&self, guild_id: GuildId) -> bool {
        self.guilds.remove(&guild_id).is_some()
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.guilds.contains_key(&guild_id)
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn admin_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.guilds.get(&guild_id).and_then(|g| g.admin_channel)
    }

    pub fn admin_role(&self, guild_id: GuildId) -> Option<RoleId> {
        self.guilds.get(&guild_id).and_then(|g| g.admin_role)
    }

    pub fn everyone_role(&self, guild_id: GuildId) -> Option<RoleId> {
        self.guilds.get(&guild_id).map(|g| g.everyone_role)
    }

    /// Append a case to the guild's active set. Returns false if the guild
    /// is unknown or one of the case's channels is already in use.
    pub fn record_case(&self, case: EscalationCase) -> bool {
        let Some(mut guild) = self.guilds.get_mut(&case.guild_id) else {
            return false;
        };
        if case.channels().any(|ch| guild.find_case(ch).is_some()) {
            return false;
        }
        guild.cases.push(case);
        true
    }

    /// Remove a case by identity. The returned case is marked resolved.
    pub fn remove_case(&self, guild_id: GuildId, case_id: Uuid) -> Option<EscalationCase> {
        let mut guild = self.guilds.get_mut(&guild_id)?;
        let idx = guild.cases.iter().position(|c| c.id == case_id)?;
        let mut case = guild.cases.remove(idx);
        case.state = CaseState::Resolved;
        Some(case)
    }

    pub fn find_case_by_channel(
        &self,
        guild_id: GuildId,
        channel: ChannelId,
    ) -> Option<(EscalationCase, ChannelSide)> {
        let guild = self.guilds.get(&guild_id)?;
        guild
            .find_case(channel)
            .map(|(case, side)| (case.clone(), side))
    }

    pub fn open_case_for(&self, guild_id: GuildId, requester: UserId) -> Option<EscalationCase> {
        let guild = self.guilds.get(&guild_id)?;
        guild
            .cases
            .iter()
            .find(|c| c.requester == requester)
            .cloned()
    }

    pub fn open_cases(&self, guild_id: GuildId) -> Vec<EscalationCase> {
        self.guilds
            .get(&guild_id)
            .map(|g| g.cases.clone())
            .unwrap_or_default()
    }
}
