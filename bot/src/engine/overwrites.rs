use serde::Deserialize;

use super::guild::ChannelSide;
use super::model::{RoleId, UserId};
use super::permissions::{CASE_MEMBER_ACCESS, ChannelOverride, OverrideTarget, Permissions};

/// One principal and whether it may see the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub target: OverrideTarget,
    pub visible: bool,
}

impl Grant {
    pub fn show(target: OverrideTarget) -> Self {
        Self {
            target,
            visible: true,
        }
    }

    pub fn hide(target: OverrideTarget) -> Self {
        Self {
            target,
            visible: false,
        }
    }
}

/// Whether escalation channels carry an explicit overwrite for the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BotVisibility {
    /// Allow the bot into the channel explicitly.
    #[default]
    Grant,
    /// Deny the bot's own overwrite and rely on its role permissions
    /// (administrator bots still see the channel).
    Deny,
}

/// Build the overwrite set a new escalation channel is created with.
///
/// `@everyone` is always denied VIEW_CHANNEL and comes first. Grants naming
/// `@everyone` are ignored. A principal granted twice keeps its first
/// position and its last visibility.
pub fn build_overwrites(everyone_role: RoleId, grants: &[Grant]) -> Vec<ChannelOverride> {
    let mut overwrites = vec![ChannelOverride {
        target: OverrideTarget::Role(everyone_role),
        allow: Permissions::empty(),
        deny: Permissions::VIEW_CHANNEL,
    }];

    for grant in grants {
        if grant.target == OverrideTarget::Role(everyone_role) {
            continue;
        }
        let (allow, deny) = if grant.visible {
            (CASE_MEMBER_ACCESS, Permissions::empty())
        } else {
            (Permissions::empty(), Permissions::VIEW_CHANNEL)
        };
        match overwrites.iter_mut().find(|ov| ov.target == grant.target) {
            Some(existing) => {
                existing.allow = allow;
                existing.deny = deny;
            }
            None => overwrites.push(ChannelOverride {
                target: grant.target,
                allow,
                deny,
            }),
        }
    }

    overwrites
}

/// Grants for one channel of a case.
///
/// The user side of a mirrored pair hides the admin role: admins follow the
/// conversation from their own side.
pub fn case_grants(
    side: ChannelSide,
    requester: UserId,
    admin_role: RoleId,
    bot: UserId,
    bot_visibility: BotVisibility,
) -> Vec<Grant> {
    let requester = OverrideTarget::User(requester);
    let admins = OverrideTarget::Role(admin_role);
    let mut grants = match side {
        ChannelSide::User => vec![Grant::show(requester), Grant::hide(admins)],
        ChannelSide::Admin => vec![Grant::show(admins)],
        ChannelSide::Shared => vec![Grant::show(requester), Grant::show(admins)],
    };
    grants.push(Grant {
        target: OverrideTarget::User(bot),
        visible: bot_visibility == BotVisibility::Grant,
    });
    grants
}
