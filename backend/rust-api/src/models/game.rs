use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{leaderboard::LeaderboardView, PublicQuestion};

/// In-memory progress of one player through the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub current_index: usize,
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub attempts: u32,
    pub avg_response_time_seconds: f64,
    pub elapsed_seconds: u64,
    pub progress: f64,
    pub completed: bool,
}

/// Row handed to the session store, keyed by `player_id` (upsert, last write wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSessionRecord {
    pub player_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub current_question: u32,
    pub score: u32,
    pub progress: f64,
    pub completed: bool,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub attempts: u32,
    pub avg_response_time: f64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub time_spent: u64,
    /// Set when the record was written between submit and advance.
    #[serde(default)]
    pub answered_current: bool,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuizState {
    AwaitingAnswer {
        index: usize,
    },
    Answered {
        index: usize,
        /// `None` when restored from a record written after the answer.
        selected: Option<usize>,
    },
    Completed,
}

impl QuizState {
    pub fn is_completed(&self) -> bool {
        matches!(self, QuizState::Completed)
    }

    pub fn is_awaiting_answer(&self) -> bool {
        matches!(self, QuizState::AwaitingAnswer { .. })
    }
}

/// Derived per submission, never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub question_id: u32,
    pub selected_index: usize,
    pub is_correct: bool,
    pub response_time_seconds: f64,
    pub points_awarded: u32,
    pub speed_bonus: u32,
    pub streak_multiplier_applied: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub current_index: usize,
    pub total_questions: usize,
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub attempts: u32,
    pub accuracy: f64,
    pub avg_response_time_seconds: f64,
    pub elapsed_seconds: u64,
    pub progress: f64,
    pub completed: bool,
}

/// UI notification emitted by the engine. Carries nothing back into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizSignal {
    Correct {
        points: u32,
        speed_bonus: u32,
        multiplier: f64,
        streak: u32,
    },
    Incorrect {
        correct_index: usize,
        explanation: String,
    },
    StreakBanner {
        streak: u32,
        multiplier: f64,
    },
    GameComplete {
        score: u32,
        correct_count: u32,
        total_questions: usize,
        best_streak: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSignal {
    #[serde(flatten)]
    pub signal: QuizSignal,
    pub emitted_at: DateTime<Utc>,
    pub display_ms: u64,
}

impl TimedSignal {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.emitted_at + chrono::Duration::milliseconds(self.display_ms as i64)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartGameRequest {
    #[validate(length(min = 1, max = 128))]
    pub player_id: String,
    #[validate(length(min = 1, max = 64))]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub selected_index: usize,
    /// Measured by the client; the server clock is used when absent.
    #[validate(range(min = 0.0, max = 86400.0))]
    pub response_time_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStatus {
    Saved,
    Queued,
    Failed,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameView {
    pub player_id: String,
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub state: QuizState,
    pub question: Option<PublicQuestion>,
    pub stats: GameStats,
    pub signals: Vec<TimedSignal>,
    pub restored: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartGameResponse {
    #[serde(flatten)]
    pub game: GameView,
    pub persistence: PersistenceStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub event: AnswerEvent,
    pub correct_index: usize,
    pub explanation: String,
    pub stats: GameStats,
    pub signals: Vec<TimedSignal>,
    pub persistence: PersistenceStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvanceResponse {
    #[serde(flatten)]
    pub game: GameView,
    pub completed: bool,
    pub leaderboard: Option<LeaderboardView>,
    pub persistence: PersistenceStatus,
}
