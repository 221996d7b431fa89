//! Conversions between serenity's model and ours.

use serenity::all::{
    Guild, Message, PermissionOverwrite, PermissionOverwriteType, Permissions as SerenityPermissions,
    RoleId as SerenityRoleId, UserId as SerenityUserId,
};

use crate::engine::model::{
    Author, ChannelId, ChannelSnapshot, GuildId, GuildSnapshot, InboundMessage, MessageId, RoleId,
    RoleSnapshot, UserId,
};
use crate::engine::permissions::{ChannelOverride, OverrideTarget, Permissions};
use crate::platform::PlatformError;

pub fn permissions(value: SerenityPermissions) -> Permissions {
    Permissions::from_bits_truncate(value.bits())
}

fn serenity_permissions(value: Permissions) -> SerenityPermissions {
    SerenityPermissions::from_bits_truncate(value.bits())
}

/// Roles come out highest position first, so rules that pick "the first"
/// role prefer the most senior one.
pub fn guild_snapshot(guild: &Guild) -> GuildSnapshot {
    let mut roles: Vec<_> = guild.roles.values().collect();
    roles.sort_by(|a, b| b.position.cmp(&a.position).then(a.id.cmp(&b.id)));

    GuildSnapshot {
        id: GuildId(guild.id.get()),
        name: guild.name.clone(),
        everyone_role: RoleId(guild.id.get()),
        channels: guild
            .channels
            .values()
            .map(|channel| ChannelSnapshot {
                id: ChannelId(channel.id.get()),
                name: channel.name.clone(),
            })
            .collect(),
        roles: roles
            .into_iter()
            .map(|role| RoleSnapshot {
                id: RoleId(role.id.get()),
                name: role.name.clone(),
                permissions: permissions(role.permissions),
                managed: role.managed,
            })
            .collect(),
    }
}

pub fn inbound_message(msg: &Message) -> InboundMessage {
    InboundMessage {
        id: MessageId(msg.id.get()),
        channel_id: ChannelId(msg.channel_id.get()),
        guild_id: msg.guild_id.map(|id| GuildId(id.get())),
        author: Author {
            id: UserId(msg.author.id.get()),
            name: msg.author.name.clone(),
            bot: msg.author.bot,
        },
        content: msg.content.clone(),
    }
}

pub fn overwrite_to_serenity(overwrite: &ChannelOverride) -> PermissionOverwrite {
    let kind = match overwrite.target {
        OverrideTarget::Role(role) => PermissionOverwriteType::Role(SerenityRoleId::new(role.get())),
        OverrideTarget::User(user) => {
            PermissionOverwriteType::Member(SerenityUserId::new(user.get()))
        }
    };
    PermissionOverwrite {
        allow: serenity_permissions(overwrite.allow),
        deny: serenity_permissions(overwrite.deny),
        kind,
    }
}

pub fn overwrite_from_serenity(overwrite: &PermissionOverwrite) -> Option<ChannelOverride> {
    let target = match overwrite.kind {
        PermissionOverwriteType::Role(role) => OverrideTarget::Role(RoleId(role.get())),
        PermissionOverwriteType::Member(user) => OverrideTarget::User(UserId(user.get())),
        _ => return None,
    };
    Some(ChannelOverride {
        target,
        allow: permissions(overwrite.allow),
        deny: permissions(overwrite.deny),
    })
}

pub fn platform_error(error: serenity::Error) -> PlatformError {
    if let serenity::Error::Http(http) = &error {
        match http.status_code().map(|status| status.as_u16()) {
            Some(404) => return PlatformError::NotFound,
            Some(403) => return PlatformError::Forbidden,
            _ => {}
        }
    }
    PlatformError::Api(error.to_string())
}
