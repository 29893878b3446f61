use std::sync::Arc;

use uuid::Uuid;

use crate::metrics::{record_persistence_failure, CHAT_MESSAGES_TOTAL};
use crate::models::chat::{
    ChatMessage, ChatRequest, ChatResponse, ChatRole, LegalAdviceRequest, LegalAdviceResponse,
};

use super::clock::Clock;
use super::keyword_responder::KeywordResponder;
use super::stores::ChatHistoryStore;
use super::AppState;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 200;

/// Chatbot and legal-advice replies. History writes are best-effort: a reply is
/// returned even when the conversation cannot be stored.
pub struct ChatService {
    chatbot: Arc<KeywordResponder>,
    legal_advisor: Arc<KeywordResponder>,
    history: Arc<dyn ChatHistoryStore>,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(
        chatbot: Arc<KeywordResponder>,
        legal_advisor: Arc<KeywordResponder>,
        history: Arc<dyn ChatHistoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chatbot,
            legal_advisor,
            history,
            clock,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.chatbot.clone(),
            state.legal_advisor.clone(),
            state.chat_history.clone(),
            state.clock.clone(),
        )
    }

    pub async fn ask(&self, req: ChatRequest) -> ChatResponse {
        let session_id = req
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let reply = self.chatbot.respond(&req.message);
        CHAT_MESSAGES_TOTAL
            .with_label_values(&["chatbot", matched_label(reply.keyword)])
            .inc();
        tracing::debug!(
            "Chat reply: session={}, keyword={:?}",
            session_id,
            reply.keyword
        );

        self.record(&session_id, ChatRole::User, &req.message).await;
        self.record(&session_id, ChatRole::Bot, reply.text).await;

        ChatResponse {
            session_id,
            reply: reply.text.to_string(),
            matched_keyword: reply.keyword.map(str::to_string),
        }
    }

    /// Oldest first. An unreachable store yields an empty conversation.
    pub async fn history(&self, session_id: &str, limit: Option<usize>) -> Vec<ChatMessage> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        match self.history.recent(session_id, limit).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Failed to load chat history: session={}, error={}", session_id, e);
                record_persistence_failure("chat_history");
                Vec::new()
            }
        }
    }

    pub fn legal_advice(&self, req: &LegalAdviceRequest) -> LegalAdviceResponse {
        // the category is matched along with the question text
        let input = match req.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => format!("{} {}", category, req.question),
            _ => req.question.clone(),
        };

        let reply = self.legal_advisor.respond(&input);
        CHAT_MESSAGES_TOTAL
            .with_label_values(&["legal_advisor", matched_label(reply.keyword)])
            .inc();

        LegalAdviceResponse {
            advice: reply.text.to_string(),
            matched_keyword: reply.keyword.map(str::to_string),
        }
    }

    async fn record(&self, session_id: &str, role: ChatRole, text: &str) {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            text: text.to_string(),
            created_at: self.clock.now(),
        };

        if let Err(e) = self.history.append(&message).await {
            tracing::warn!(
                "Failed to store chat message: session={}, role={}, error={}",
                session_id,
                role.as_str(),
                e
            );
            record_persistence_failure("chat_append");
        }
    }
}

fn matched_label(keyword: Option<&str>) -> &'static str {
    if keyword.is_some() {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use crate::services::stores::InMemoryChatHistory;
    use chrono::Utc;

    fn service(history: Arc<InMemoryChatHistory>) -> ChatService {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        ChatService::new(
            Arc::new(KeywordResponder::policy_chatbot()),
            Arc::new(KeywordResponder::legal_advisor()),
            history,
            clock,
        )
    }

    fn ask(session_id: Option<&str>, message: &str) -> ChatRequest {
        ChatRequest {
            session_id: session_id.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn conversation_is_stored_in_order() {
        let history = Arc::new(InMemoryChatHistory::new());
        let service = service(history.clone());

        let response = service
            .ask(ask(Some("s1"), "What is universal healthcare?"))
            .await;

        assert_eq!(response.session_id, "s1");
        assert_eq!(response.matched_keyword.as_deref(), Some("healthcare"));

        let messages = service.history("s1", None).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].text, "What is universal healthcare?");
        assert_eq!(messages[1].role, ChatRole::Bot);
        assert_eq!(messages[1].text, response.reply);
    }

    #[tokio::test]
    async fn missing_session_id_gets_generated() {
        let service = service(Arc::new(InMemoryChatHistory::new()));

        let response = service.ask(ask(None, "asdkjaslkdj")).await;

        assert!(Uuid::parse_str(&response.session_id).is_ok());
        assert!(response.matched_keyword.is_none());
    }

    #[tokio::test]
    async fn reply_survives_history_outage() {
        let history = Arc::new(InMemoryChatHistory::new());
        history.set_available(false);
        let service = service(history);

        let response = service.ask(ask(Some("s1"), "Tell me about pension")).await;

        assert_eq!(response.matched_keyword.as_deref(), Some("pension"));
        assert!(service.history("s1", None).await.is_empty());
    }

    #[tokio::test]
    async fn history_limit_keeps_latest_messages() {
        let service = service(Arc::new(InMemoryChatHistory::new()));
        for i in 0..3 {
            service.ask(ask(Some("s1"), &format!("question {}", i))).await;
        }

        let messages = service.history("s1", Some(2)).await;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "question 2");
        assert_eq!(messages[1].role, ChatRole::Bot);
    }

    #[test]
    fn legal_advice_uses_category() {
        let service = service(Arc::new(InMemoryChatHistory::new()));

        let with_category = service.legal_advice(&LegalAdviceRequest {
            category: Some("Divorce".to_string()),
            question: "What happens to the house?".to_string(),
        });
        let without = service.legal_advice(&LegalAdviceRequest {
            category: None,
            question: "What happens to the house?".to_string(),
        });

        assert_eq!(with_category.matched_keyword.as_deref(), Some("divorce"));
        assert!(without.matched_keyword.is_none());
    }
}
