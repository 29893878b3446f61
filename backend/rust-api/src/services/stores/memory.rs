use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ChatHistoryStore, LeaderboardCache, LeaderboardSource, SessionStore};
use crate::errors::StoreError;
use crate::models::chat::ChatMessage;
use crate::models::game::GameSessionRecord;
use crate::models::leaderboard::LeaderboardEntry;

/// Process-local session rows for the `memory` storage backend and tests.
/// `set_available(false)` makes every call fail like an unreachable backend.
#[derive(Default)]
pub struct InMemorySessionStore {
    records: Mutex<HashMap<String, GameSessionRecord>>,
    unavailable: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub async fn get(&self, player_id: &str) -> Option<GameSessionRecord> {
        self.records.lock().await.get(player_id).cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("session store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, player_id: &str) -> Result<Option<GameSessionRecord>, StoreError> {
        self.check()?;
        Ok(self.records.lock().await.get(player_id).cloned())
    }

    async fn upsert(&self, record: &GameSessionRecord) -> Result<(), StoreError> {
        self.check()?;
        self.records
            .lock()
            .await
            .insert(record.player_id.clone(), record.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}

#[async_trait]
impl LeaderboardSource for InMemorySessionStore {
    async fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        self.check()?;
        let records = self.records.lock().await;
        let mut rows: Vec<&GameSessionRecord> = records.values().collect();
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|record| LeaderboardEntry {
                player_id: record.player_id.clone(),
                score: record.score,
                display_name: record.display_name.clone(),
            })
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryLeaderboardCache {
    entries: Mutex<Option<(Vec<LeaderboardEntry>, Instant)>>,
}

impl InMemoryLeaderboardCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaderboardCache for InMemoryLeaderboardCache {
    async fn load(&self) -> Result<Option<Vec<LeaderboardEntry>>, StoreError> {
        let guard = self.entries.lock().await;
        Ok(guard
            .as_ref()
            .filter(|(_, expires_at)| Instant::now() < *expires_at)
            .map(|(entries, _)| entries.clone()))
    }

    async fn store(&self, entries: &[LeaderboardEntry], ttl_secs: u64) -> Result<(), StoreError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        *self.entries.lock().await = Some((entries.to_vec(), expires_at));
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryChatHistory {
    messages: Mutex<Vec<ChatMessage>>,
    unavailable: AtomicBool,
}

impl InMemoryChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("chat history offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatHistoryStore for InMemoryChatHistory {
    async fn append(&self, message: &ChatMessage) -> Result<(), StoreError> {
        self.check()?;
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        self.check()?;
        let messages = self.messages.lock().await;
        let conversation: Vec<&ChatMessage> = messages
            .iter()
            .filter(|message| message.session_id == session_id)
            .collect();
        let skip = conversation.len().saturating_sub(limit);
        Ok(conversation.into_iter().skip(skip).cloned().collect())
    }
}
