use std::sync::Arc;

use crate::config::Config;
use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;

use self::catalog::QuestionCatalog;
use self::clock::{Clock, SystemClock};
use self::game_registry::GameRegistry;
use self::keyword_responder::KeywordResponder;
use self::leaderboard_service::LeaderboardService;
use self::session_writer::SessionWriter;
use self::stores::{
    ChatHistoryStore, InMemoryChatHistory, InMemoryLeaderboardCache, InMemorySessionStore,
    LeaderboardCache, LeaderboardSource, MongoStore, RedisLeaderboardCache, SessionStore,
};

pub mod catalog;
pub mod chat_service;
pub mod clock;
pub mod game_registry;
pub mod game_service;
pub mod keyword_responder;
pub mod leaderboard_service;
pub mod quiz_engine;
pub mod scoring;
pub mod session_writer;
pub mod stores;

/// Storage handles a state is built from.
pub struct Stores {
    pub sessions: Arc<dyn SessionStore>,
    pub leaderboard_source: Arc<dyn LeaderboardSource>,
    pub leaderboard_cache: Arc<dyn LeaderboardCache>,
    pub chat_history: Arc<dyn ChatHistoryStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let sessions = Arc::new(InMemorySessionStore::new());
        Self {
            sessions: sessions.clone(),
            leaderboard_source: sessions,
            leaderboard_cache: Arc::new(InMemoryLeaderboardCache::new()),
            chat_history: Arc::new(InMemoryChatHistory::new()),
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub catalog: Arc<QuestionCatalog>,
    pub games: Arc<GameRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub session_writer: SessionWriter,
    pub leaderboard_source: Arc<dyn LeaderboardSource>,
    pub leaderboard_cache: Arc<dyn LeaderboardCache>,
    pub chat_history: Arc<dyn ChatHistoryStore>,
    pub chatbot: Arc<KeywordResponder>,
    pub legal_advisor: Arc<KeywordResponder>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        tracing::info!("Redis ConnectionManager created, testing with PING...");

        let mut conn = redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        let mongo_store = Arc::new(MongoStore::new(mongo));
        let stores = Stores {
            sessions: mongo_store.clone(),
            leaderboard_source: mongo_store.clone(),
            leaderboard_cache: Arc::new(RedisLeaderboardCache::new(redis)),
            chat_history: mongo_store,
        };

        Self::with_stores(config, stores, Arc::new(SystemClock))
    }

    /// No external services; everything lives in process memory.
    pub fn in_memory(config: Config) -> anyhow::Result<Self> {
        tracing::info!("Using in-memory storage backend");
        Self::with_stores(config, Stores::in_memory(), Arc::new(SystemClock))
    }

    /// Must run inside the tokio runtime; it spawns the session writer.
    pub fn with_stores(
        config: Config,
        stores: Stores,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let catalog = QuestionCatalog::load(config.quiz.catalog_path.as_deref())?;

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            games: Arc::new(GameRegistry::new()),
            session_writer: SessionWriter::spawn(stores.sessions.clone()),
            sessions: stores.sessions,
            leaderboard_source: stores.leaderboard_source,
            leaderboard_cache: stores.leaderboard_cache,
            chat_history: stores.chat_history,
            chatbot: Arc::new(KeywordResponder::policy_chatbot()),
            legal_advisor: Arc::new(KeywordResponder::legal_advisor()),
            clock,
        })
    }

    pub fn leaderboard_service(&self) -> LeaderboardService {
        LeaderboardService::new(
            self.leaderboard_source.clone(),
            self.leaderboard_cache.clone(),
            self.clock.clone(),
            self.config.leaderboard.size,
            self.config.leaderboard.cache_ttl_secs,
        )
    }
}
