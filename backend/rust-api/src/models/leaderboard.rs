use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub score: u32,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardView {
    pub entries: Vec<LeaderboardEntry>,
    /// True when the source could not be reached and cached (or no) data is shown.
    pub stale: bool,
    pub fetched_at: DateTime<Utc>,
}
