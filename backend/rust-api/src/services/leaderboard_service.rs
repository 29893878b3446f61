use std::sync::Arc;

use crate::metrics::{record_persistence_failure, LEADERBOARD_FETCHES_TOTAL};
use crate::models::leaderboard::LeaderboardView;

use super::clock::Clock;
use super::stores::{LeaderboardCache, LeaderboardSource};

/// Top-N by score, read from the source as ordered. A failed query falls back
/// to the last cached list (or nothing) and is marked stale.
pub struct LeaderboardService {
    source: Arc<dyn LeaderboardSource>,
    cache: Arc<dyn LeaderboardCache>,
    clock: Arc<dyn Clock>,
    size: usize,
    cache_ttl_secs: u64,
}

impl LeaderboardService {
    pub fn new(
        source: Arc<dyn LeaderboardSource>,
        cache: Arc<dyn LeaderboardCache>,
        clock: Arc<dyn Clock>,
        size: usize,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
            size,
            cache_ttl_secs,
        }
    }

    pub async fn top(&self) -> LeaderboardView {
        let fetched_at = self.clock.now();

        match self.source.top_scores(self.size).await {
            Ok(mut entries) => {
                entries.truncate(self.size);
                LEADERBOARD_FETCHES_TOTAL.with_label_values(&["fresh"]).inc();

                if let Err(e) = self.cache.store(&entries, self.cache_ttl_secs).await {
                    tracing::warn!("Failed to cache leaderboard: {}", e);
                }

                LeaderboardView {
                    entries,
                    stale: false,
                    fetched_at,
                }
            }
            Err(e) => {
                tracing::warn!("Leaderboard query failed, serving cached data: {}", e);
                record_persistence_failure("leaderboard_fetch");

                let entries = match self.cache.load().await {
                    Ok(Some(entries)) => {
                        LEADERBOARD_FETCHES_TOTAL.with_label_values(&["cached"]).inc();
                        entries
                    }
                    Ok(None) => {
                        LEADERBOARD_FETCHES_TOTAL.with_label_values(&["empty"]).inc();
                        Vec::new()
                    }
                    Err(cache_err) => {
                        tracing::warn!("Leaderboard cache unavailable: {}", cache_err);
                        LEADERBOARD_FETCHES_TOTAL.with_label_values(&["empty"]).inc();
                        Vec::new()
                    }
                };

                LeaderboardView {
                    entries,
                    stale: true,
                    fetched_at,
                }
            }
        }
    }
}
