use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    TimerTick(TimerTick),
    GameComplete(GameCompleteEvent),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimerTick {
    pub player_id: String,
    pub question_index: usize,
    pub elapsed_seconds: u64,
    pub answered: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GameCompleteEvent {
    pub player_id: String,
    pub score: u32,
    pub elapsed_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

impl TimerEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TimerEvent::TimerTick(_) => "timer-tick",
            TimerEvent::GameComplete(_) => "game-complete",
        }
    }
}
