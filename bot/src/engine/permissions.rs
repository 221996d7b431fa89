use bitflags::bitflags;

use super::model::{RoleId, UserId};

bitflags! {
    /// Permission bitfield for roles and channel overwrites.
    /// Bit positions match the Discord API so values convert with
    /// `from_bits_truncate` at the adapter boundary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        // ── General ──
        const CREATE_INVITES        = 1 << 0;
        const KICK_MEMBERS          = 1 << 1;
        const BAN_MEMBERS           = 1 << 2;
        const ADMINISTRATOR         = 1 << 3;
        const MANAGE_CHANNELS       = 1 << 4;
        const MANAGE_SERVER         = 1 << 5;
        const ADD_REACTIONS         = 1 << 6;

        // ── Channel text ──
        const VIEW_CHANNEL          = 1 << 10;
        const SEND_MESSAGES         = 1 << 11;
        const MANAGE_MESSAGES       = 1 << 13;
        const EMBED_LINKS           = 1 << 14;
        const ATTACH_FILES          = 1 << 15;
        const READ_MESSAGE_HISTORY  = 1 << 16;
        const MENTION_EVERYONE      = 1 << 17;

        const MANAGE_ROLES          = 1 << 28;
    }
}

/// What a principal that is allowed into an escalation channel gets.
pub const CASE_MEMBER_ACCESS: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::READ_MESSAGE_HISTORY);

/// A channel permission overwrite (allow/deny pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOverride {
    pub target: OverrideTarget,
    pub allow: Permissions,
    pub deny: Permissions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideTarget {
    Role(RoleId),
    User(UserId),
}

/// Compute a user's effective permissions in a channel.
///
/// Algorithm (mirrors Discord):
///   1. Guild owner gets all permissions unconditionally.
///   2. Start with `@everyone` role's base permissions.
///   3. OR in all the user's assigned role permissions.
///   4. If ADMINISTRATOR is set, return all permissions.
///   5. Apply channel overwrite for `@everyone` role (allow OR, deny AND NOT).
///   6. OR all of the user's role allows, AND NOT all role denies.
///   7. Apply user-specific overwrite (allow OR, deny AND NOT).
pub fn compute_effective_permissions(
    base_everyone: Permissions,
    user_role_permissions: &[(RoleId, Permissions)],
    channel_overrides: &[ChannelOverride],
    everyone_role: RoleId,
    user: UserId,
    is_owner: bool,
) -> Permissions {
    if is_owner {
        return Permissions::all();
    }

    let mut perms = base_everyone;
    for (_role, role_perms) in user_role_permissions {
        perms |= *role_perms;
    }

    if perms.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    if channel_overrides.is_empty() {
        return perms;
    }

    for ov in channel_overrides {
        if ov.target == OverrideTarget::Role(everyone_role) {
            perms |= ov.allow;
            perms &= !ov.deny;
        }
    }

    let mut role_allow = Permissions::empty();
    let mut role_deny = Permissions::empty();
    for ov in channel_overrides {
        if let OverrideTarget::Role(role) = ov.target
            && role != everyone_role
            && user_role_permissions.iter().any(|(id, _)| *id == role)
        {
            role_allow |= ov.allow;
            role_deny |= ov.deny;
        }
    }
    perms |= role_allow;
    perms &= !role_deny;

    for ov in channel_overrides {
        if ov.target == OverrideTarget::User(user) {
            perms |= ov.allow;
            perms &= !ov.deny;
        }
    }

    perms
}
