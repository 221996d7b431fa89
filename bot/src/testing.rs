//! In-memory [`ChatPlatform`] for tests. Records every successful outbound
//! call and can be told to fail or stall individual operations.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::engine::model::{
    Author, ChannelId, ChannelSnapshot, GuildId, GuildSnapshot, InboundMessage, MessageId,
    MessageRef, RecentMessage, RoleId, RoleSnapshot, UserId,
};
use crate::engine::permissions::{ChannelOverride, Permissions};
use crate::platform::{ChatPlatform, PlatformError};

pub const BOT: UserId = UserId(999);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Send,
    Direct,
    Edit,
    DeleteMessage,
    CreateChannel,
    DeleteChannel,
    Fetch,
    IsAdministrator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        channel: ChannelId,
        text: String,
    },
    Direct {
        user: UserId,
        text: String,
    },
    Edit {
        message: MessageRef,
        text: String,
    },
    DeleteMessage(MessageRef),
    CreateChannel {
        guild: GuildId,
        name: String,
        id: ChannelId,
        overwrites: Vec<ChannelOverride>,
    },
    DeleteChannel(ChannelId),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    attempts: HashMap<Op, usize>,
    failures: HashMap<Op, VecDeque<Option<PlatformError>>>,
    stalled: HashSet<Op>,
    administrators: HashSet<UserId>,
    history: HashMap<ChannelId, Vec<RecentMessage>>,
}

pub struct RecordingPlatform {
    bot: UserId,
    next_id: AtomicU64,
    state: Mutex<State>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self {
            bot: BOT,
            next_id: AtomicU64::new(1000),
            state: Mutex::new(State::default()),
        }
    }

    /// Queue a failure for the next attempt of `op`.
    pub fn fail_next(&self, op: Op, error: PlatformError) {
        let mut state = self.state.lock().unwrap();
        state.failures.entry(op).or_default().push_back(Some(error));
    }

    /// Let the next attempt of `op` through; failures queued after it apply
    /// to later attempts.
    pub fn succeed_next(&self, op: Op) {
        let mut state = self.state.lock().unwrap();
        state.failures.entry(op).or_default().push_back(None);
    }

    /// Every later attempt of `op` never completes.
    pub fn stall(&self, op: Op) {
        self.state.lock().unwrap().stalled.insert(op);
    }

    pub fn set_administrator(&self, user: UserId) {
        self.state.lock().unwrap().administrators.insert(user);
    }

    pub fn push_history(&self, channel: ChannelId, author: UserId) {
        let id = MessageId(self.fresh_id());
        self.state
            .lock()
            .unwrap()
            .history
            .entry(channel)
            .or_default()
            .push(RecentMessage { id, author });
    }

    /// Attempts of `op`, failed ones included.
    pub fn count(&self, op: Op) -> usize {
        self.state
            .lock()
            .unwrap()
            .attempts
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Texts sent to `channel`, in order.
    pub fn sent_to(&self, channel: ChannelId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { channel: c, text } if c == channel => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn directs_to(&self, user: UserId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Direct { user: u, text } if u == user => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn created_channels(&self) -> Vec<(String, ChannelId, Vec<ChannelOverride>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateChannel {
                    name,
                    id,
                    overwrites,
                    ..
                } => Some((name, id, overwrites)),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_channels(&self) -> Vec<ChannelId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::DeleteChannel(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_messages(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::DeleteMessage(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Count the attempt, then either stall, fail, or let the call through.
    async fn attempt(&self, op: Op) -> Result<(), PlatformError> {
        let (stalled, failure) = {
            let mut state = self.state.lock().unwrap();
            *state.attempts.entry(op).or_default() += 1;
            let stalled = state.stalled.contains(&op);
            let failure = state
                .failures
                .get_mut(&op)
                .and_then(VecDeque::pop_front)
                .flatten();
            (stalled, failure)
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    fn bot_user(&self) -> UserId {
        self.bot
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageRef, PlatformError> {
        self.attempt(Op::Send).await?;
        self.record(Call::Send {
            channel,
            text: text.to_string(),
        });
        Ok(MessageRef {
            channel_id: channel,
            message_id: MessageId(self.fresh_id()),
        })
    }

    async fn send_direct(&self, user: UserId, text: &str) -> Result<MessageRef, PlatformError> {
        self.attempt(Op::Direct).await?;
        self.record(Call::Direct {
            user,
            text: text.to_string(),
        });
        Ok(MessageRef {
            channel_id: ChannelId(user.get()),
            message_id: MessageId(self.fresh_id()),
        })
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<(), PlatformError> {
        self.attempt(Op::Edit).await?;
        self.record(Call::Edit {
            message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError> {
        self.attempt(Op::DeleteMessage).await?;
        self.record(Call::DeleteMessage(message));
        Ok(())
    }

    async fn create_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: &[ChannelOverride],
    ) -> Result<ChannelId, PlatformError> {
        self.attempt(Op::CreateChannel).await?;
        let id = ChannelId(self.fresh_id());
        self.record(Call::CreateChannel {
            guild,
            name: name.to_string(),
            id,
            overwrites: overwrites.to_vec(),
        });
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        self.attempt(Op::DeleteChannel).await?;
        self.record(Call::DeleteChannel(channel));
        Ok(())
    }

    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
        author: Option<UserId>,
    ) -> Result<Vec<RecentMessage>, PlatformError> {
        self.attempt(Op::Fetch).await?;
        let state = self.state.lock().unwrap();
        let history = state.history.get(&channel).cloned().unwrap_or_default();
        Ok(history
            .into_iter()
            .rev()
            .take(limit)
            .filter(|m| author.is_none_or(|a| m.author == a))
            .collect())
    }

    async fn is_administrator(
        &self,
        _guild: GuildId,
        _channel: ChannelId,
        user: UserId,
    ) -> Result<bool, PlatformError> {
        self.attempt(Op::IsAdministrator).await?;
        Ok(self.state.lock().unwrap().administrators.contains(&user))
    }
}

// Fixtures shared by the scenario tests.

pub const GUILD: GuildId = GuildId(100);
pub const EVERYONE: RoleId = RoleId(100);
pub const ADMIN_ROLE: RoleId = RoleId(200);
pub const ADMIN_CHANNEL: ChannelId = ChannelId(300);
pub const GENERAL: ChannelId = ChannelId(301);

/// A guild with `#admins`, `#general` and an `admins` role.
pub fn guild_snapshot() -> GuildSnapshot {
    GuildSnapshot {
        id: GUILD,
        name: "Test Guild".into(),
        everyone_role: EVERYONE,
        channels: vec![
            ChannelSnapshot {
                id: ADMIN_CHANNEL,
                name: "admins".into(),
            },
            ChannelSnapshot {
                id: GENERAL,
                name: "general".into(),
            },
        ],
        roles: vec![
            RoleSnapshot {
                id: ADMIN_ROLE,
                name: "admins".into(),
                permissions: Permissions::ADMINISTRATOR,
                managed: false,
            },
            RoleSnapshot {
                id: EVERYONE,
                name: "@everyone".into(),
                permissions: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
                managed: false,
            },
        ],
    }
}

pub fn author(id: u64, name: &str) -> Author {
    Author {
        id: UserId(id),
        name: name.into(),
        bot: false,
    }
}

/// A guild message with a fresh-enough id.
pub fn message(channel: ChannelId, author: Author, content: &str) -> InboundMessage {
    static NEXT: AtomicU64 = AtomicU64::new(50_000);
    InboundMessage {
        id: MessageId(NEXT.fetch_add(1, Ordering::Relaxed)),
        channel_id: channel,
        guild_id: Some(GUILD),
        author,
        content: content.into(),
    }
}
