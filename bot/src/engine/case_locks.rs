use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::model::{GuildId, UserId};

/// Async mutual exclusion keyed by (guild, requester). Opening and closing
/// a member's case run under this lock so two events cannot both pass the
/// "no open case yet" check.
#[derive(Default)]
pub struct CaseLocks {
    locks: DashMap<(GuildId, UserId), Arc<Mutex<()>>>,
}

impl CaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, guild_id: GuildId, user: UserId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry((guild_id, user)).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop keys nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
