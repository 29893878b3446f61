use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::LeaderboardCache;
use crate::errors::StoreError;
use crate::metrics::track_cache_operation;
use crate::models::leaderboard::LeaderboardEntry;

const LEADERBOARD_KEY: &str = "leaderboard:top";

/// Last good leaderboard, kept in Redis so a failed query can still show data.
#[derive(Clone)]
pub struct RedisLeaderboardCache {
    redis: ConnectionManager,
}

impl RedisLeaderboardCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl LeaderboardCache for RedisLeaderboardCache {
    async fn load(&self) -> Result<Option<Vec<LeaderboardEntry>>, StoreError> {
        let mut conn = self.redis.clone();
        let cached: Option<String> = track_cache_operation("get", async {
            redis::cmd("GET")
                .arg(LEADERBOARD_KEY)
                .query_async(&mut conn)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        match cached {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, entries: &[LeaderboardEntry], ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        let json = serde_json::to_string(entries)?;

        track_cache_operation("setex", async {
            redis::cmd("SETEX")
                .arg(LEADERBOARD_KEY)
                .arg(ttl_secs.max(1))
                .arg(json)
                .query_async::<()>(&mut conn)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
