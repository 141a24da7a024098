// In-memory mute store - no persistence, mainly for tests and dry runs.

use crate::core::mutes::{MuteError, MuteStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Default)]
pub struct InMemoryMuteStore {
    entries: DashMap<u64, DateTime<Utc>>,
}

impl InMemoryMuteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MuteStore for InMemoryMuteStore {
    async fn muted_until(&self, user_id: u64) -> Result<Option<DateTime<Utc>>, MuteError> {
        Ok(self.entries.get(&user_id).map(|e| *e))
    }

    async fn set_muted_until(&self, user_id: u64, until: DateTime<Utc>) -> Result<(), MuteError> {
        self.entries.insert(user_id, until);
        Ok(())
    }

    async fn clear(&self, user_id: u64) -> Result<(), MuteError> {
        self.entries.remove(&user_id);
        Ok(())
    }
}
