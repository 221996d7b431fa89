use std::fmt;

use super::permissions::Permissions;

/// Declares a snowflake id newtype. The platform adapter converts to and
/// from its own id types at the boundary.
macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(
    /// A guild (community server).
    GuildId
);
snowflake!(ChannelId);
snowflake!(UserId);
snowflake!(
    /// A role. The `@everyone` role shares its id with the guild.
    RoleId
);
snowflake!(MessageId);

impl UserId {
    /// `<@id>`
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl RoleId {
    /// `<@&id>`
    pub fn mention(self) -> String {
        format!("<@&{}>", self.0)
    }
}

impl ChannelId {
    /// `<#id>`
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

/// Enough to find a posted message again (for edits and deletes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    /// Set for any bot account, including this one.
    pub bot: bool,
}

/// A message as delivered by the gateway, stripped down to what the
/// dispatcher needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// None for direct messages.
    pub guild_id: Option<GuildId>,
    pub author: Author,
    pub content: String,
}

impl InboundMessage {
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            channel_id: self.channel_id,
            message_id: self.id,
        }
    }
}

/// One entry of a channel history fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentMessage {
    pub id: MessageId,
    pub author: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSnapshot {
    pub id: RoleId,
    pub name: String,
    pub permissions: Permissions,
    /// Integration-owned roles are never picked as the admin role.
    pub managed: bool,
}

/// What the platform reports about a guild when it becomes available.
/// Roles are ordered highest position first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSnapshot {
    pub id: GuildId,
    pub name: String,
    pub everyone_role: RoleId,
    pub channels: Vec<ChannelSnapshot>,
    pub roles: Vec<RoleSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions() {
        assert_eq!(UserId(42).mention(), "<@42>");
        assert_eq!(RoleId(7).mention(), "<@&7>");
        assert_eq!(ChannelId(9).mention(), "<#9>");
    }

    #[test]
    fn test_message_reference() {
        let msg = InboundMessage {
            id: MessageId(5),
            channel_id: ChannelId(6),
            guild_id: None,
            author: Author {
                id: UserId(1),
                name: "alice".into(),
                bot: false,
            },
            content: "hi".into(),
        };
        assert_eq!(
            msg.reference(),
            MessageRef {
                channel_id: ChannelId(6),
                message_id: MessageId(5),
            }
        );
    }
}
