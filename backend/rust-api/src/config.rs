use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongo,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizSettings {
    /// JSON catalog to load instead of the bundled one.
    pub catalog_path: Option<String>,
    pub feedback_display_ms: u64,
    pub tick_interval_ms: u64,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            catalog_path: None,
            feedback_display_ms: 2000,
            tick_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardSettings {
    pub size: usize,
    pub cache_ttl_secs: u64,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            size: 5,
            cache_ttl_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceSettings {
    /// Queue session records on the ordered writer instead of awaiting each one.
    pub background: bool,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self { background: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub redis_uri: String,
    pub mongo_database: String,
    pub bind_addr: String,
    pub storage_backend: StorageBackend,
    pub quiz: QuizSettings,
    pub leaderboard: LeaderboardSettings,
    pub persistence: PersistenceSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            redis_uri: "redis://127.0.0.1:6379/0".to_string(),
            mongo_database: "policynavigator".to_string(),
            bind_addr: "0.0.0.0:8081".to_string(),
            storage_backend: StorageBackend::default(),
            quiz: QuizSettings::default(),
            leaderboard: LeaderboardSettings::default(),
            persistence: PersistenceSettings::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then a local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml + APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let mongo_uri = setting(&settings, "database.mongo_uri", "MONGO_URI")
            .unwrap_or(defaults.mongo_uri);
        let mongo_database = setting(&settings, "database.mongo_database", "MONGO_DATABASE")
            .unwrap_or(defaults.mongo_database);
        let redis_uri =
            setting(&settings, "redis.uri", "REDIS_URI").unwrap_or(defaults.redis_uri);
        let bind_addr =
            setting(&settings, "server.bind_addr", "BIND_ADDR").unwrap_or(defaults.bind_addr);
        let storage_backend = setting(&settings, "storage.backend", "STORAGE_BACKEND")
            .unwrap_or(defaults.storage_backend);

        let quiz = QuizSettings {
            catalog_path: setting(&settings, "quiz.catalog_path", "QUIZ_CATALOG_PATH"),
            feedback_display_ms: setting(
                &settings,
                "quiz.feedback_display_ms",
                "QUIZ_FEEDBACK_DISPLAY_MS",
            )
            .unwrap_or(defaults.quiz.feedback_display_ms),
            tick_interval_ms: setting(&settings, "quiz.tick_interval_ms", "QUIZ_TICK_INTERVAL_MS")
                .filter(|v: &u64| *v > 0)
                .unwrap_or(defaults.quiz.tick_interval_ms),
        };

        let leaderboard = LeaderboardSettings {
            size: setting(&settings, "leaderboard.size", "LEADERBOARD_SIZE")
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.leaderboard.size),
            cache_ttl_secs: setting(
                &settings,
                "leaderboard.cache_ttl_secs",
                "LEADERBOARD_CACHE_TTL_SECS",
            )
            .unwrap_or(defaults.leaderboard.cache_ttl_secs),
        };

        let persistence = PersistenceSettings {
            background: setting(&settings, "persistence.background", "PERSISTENCE_BACKGROUND")
                .unwrap_or(defaults.persistence.background),
        };

        Ok(Config {
            mongo_uri,
            redis_uri,
            mongo_database,
            bind_addr,
            storage_backend,
            quiz,
            leaderboard,
            persistence,
        })
    }
}

/// File/`APP__` value first, then the plain env var. Unparseable values are
/// logged and ignored.
fn setting<T: FromStr>(settings: &config::Config, key: &str, env_key: &str) -> Option<T> {
    let raw = settings
        .get_string(key)
        .ok()
        .or_else(|| env::var(env_key).ok())?;

    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid value for {} ({}): {:?}, using default", key, env_key, raw);
            None
        }
    }
}
