//! Collaborator seams: the row store for game sessions, the leaderboard query,
//! the leaderboard cache and chat history. Services only see these traits.

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::chat::ChatMessage;
use crate::models::game::GameSessionRecord;
use crate::models::leaderboard::LeaderboardEntry;

pub mod memory;
pub mod mongo;
pub mod redis_cache;

pub use memory::{InMemoryChatHistory, InMemoryLeaderboardCache, InMemorySessionStore};
pub use mongo::MongoStore;
pub use redis_cache::RedisLeaderboardCache;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, player_id: &str) -> Result<Option<GameSessionRecord>, StoreError>;

    /// Insert or overwrite the record for `record.player_id`.
    async fn upsert(&self, record: &GameSessionRecord) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    /// Top `limit` sessions by descending score.
    async fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

#[async_trait]
pub trait LeaderboardCache: Send + Sync {
    async fn load(&self) -> Result<Option<Vec<LeaderboardEntry>>, StoreError>;

    async fn store(&self, entries: &[LeaderboardEntry], ttl_secs: u64) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    async fn append(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// Up to `limit` most recent messages of a conversation, oldest first.
    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>, StoreError>;
}
