use serde::{Deserialize, Serialize};

pub mod chat;
pub mod game;
pub mod leaderboard;
pub mod timer;

/// One multiple-choice entry of the quiz catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(alias = "correctIndex")]
    pub correct_index: usize,
    pub explanation: String,
}

/// Question as shown to a player: the answer and explanation stay server-side
/// until the question is answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: u32,
    pub prompt: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt.clone(),
            options: question.options.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub version: String,
    pub total_questions: usize,
    pub questions: Vec<PublicQuestion>,
}
