use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::ReplaceOptions,
    Collection, Database,
};

use super::{ChatHistoryStore, LeaderboardSource, SessionStore};
use crate::errors::StoreError;
use crate::models::chat::{ChatMessage, ChatRole};
use crate::models::game::GameSessionRecord;
use crate::models::leaderboard::LeaderboardEntry;
use crate::utils::time::{bson_to_chrono, chrono_to_bson};

const GAME_SESSIONS: &str = "game_sessions";
const CHAT_MESSAGES: &str = "chat_messages";

/// MongoDB-backed collaborator: session rows, the leaderboard query over
/// them, and chat history.
#[derive(Clone)]
pub struct MongoStore {
    mongo: Database,
}

impl MongoStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn sessions(&self) -> Collection<GameSessionRecord> {
        self.mongo.collection(GAME_SESSIONS)
    }

    fn chat(&self) -> Collection<Document> {
        self.mongo.collection(CHAT_MESSAGES)
    }
}

#[async_trait]
impl SessionStore for MongoStore {
    async fn load(&self, player_id: &str) -> Result<Option<GameSessionRecord>, StoreError> {
        let record = self
            .sessions()
            .find_one(doc! { "player_id": player_id })
            .await?;
        Ok(record)
    }

    async fn upsert(&self, record: &GameSessionRecord) -> Result<(), StoreError> {
        self.sessions()
            .replace_one(doc! { "player_id": &record.player_id }, record)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await?;

        tracing::debug!(
            "Game session upserted: player={}, question={}, score={}",
            record.player_id,
            record.current_question,
            record.score
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.mongo.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[async_trait]
impl LeaderboardSource for MongoStore {
    async fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let collection: Collection<LeaderboardEntry> = self.mongo.collection(GAME_SESSIONS);
        let cursor = collection
            .find(doc! {})
            .sort(doc! { "score": -1 })
            .limit(limit as i64)
            .projection(doc! { "_id": 0, "player_id": 1, "score": 1, "display_name": 1 })
            .await?;

        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl ChatHistoryStore for MongoStore {
    async fn append(&self, message: &ChatMessage) -> Result<(), StoreError> {
        self.chat().insert_one(message_to_document(message)).await?;
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        let cursor = self
            .chat()
            .find(doc! { "session_id": session_id })
            .sort(history_sort())
            .limit(limit as i64)
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        let mut messages = documents
            .iter()
            .map(document_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}

/// Newest first. `seq` orders messages written within the same millisecond.
fn history_sort() -> Document {
    doc! { "created_at": -1, "seq": -1 }
}

fn message_to_document(message: &ChatMessage) -> Document {
    doc! {
        "_id": &message.id,
        "session_id": &message.session_id,
        "role": message.role.as_str(),
        "text": &message.text,
        "created_at": chrono_to_bson(message.created_at),
        "seq": ObjectId::new(),
    }
}

fn document_to_message(document: &Document) -> Result<ChatMessage, StoreError> {
    let field = |name: &str| {
        document
            .get_str(name)
            .map(str::to_string)
            .map_err(|_| StoreError::Malformed(format!("chat message missing {}", name)))
    };

    let role = field("role")?
        .parse::<ChatRole>()
        .map_err(StoreError::Malformed)?;
    let created_at = match document.get("created_at") {
        Some(Bson::DateTime(value)) => bson_to_chrono(*value).ok_or_else(|| {
            StoreError::Malformed("chat message timestamp out of range".to_string())
        })?,
        _ => {
            return Err(StoreError::Malformed(
                "chat message missing created_at".to_string(),
            ))
        }
    };

    Ok(ChatMessage {
        id: field("_id")?,
        session_id: field("session_id")?,
        role,
        text: field("text")?,
        created_at,
    })
}
