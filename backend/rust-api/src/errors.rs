use thiserror::Error;

/// Rejections from the quiz state machine. None of them touch session counters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("Question {index} has already been answered")]
    AlreadyAnswered { index: usize },

    #[error("Selected option {selected} is out of range (question has {options} options)")]
    InvalidSelection { selected: usize, options: usize },

    #[error("Question {index} has not been answered yet")]
    NotAnswered { index: usize },

    #[error("Game is already completed")]
    GameCompleted,

    #[error("Question index {index} is outside the catalog ({total} questions)")]
    QuestionOutOfRange { index: usize, total: usize },
}

/// Fatal catalog problems detected at load time.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Question catalog is empty")]
    Empty,

    #[error("Duplicate question id {0}")]
    DuplicateId(u32),

    #[error("Question {id} has an empty prompt")]
    EmptyPrompt { id: u32 },

    #[error("Question {id} has {count} options, at least 2 required")]
    TooFewOptions { id: u32, count: usize },

    #[error("Question {id} marks option {correct_index} as correct but only has {options} options")]
    CorrectIndexOutOfRange {
        id: u32,
        correct_index: usize,
        options: usize,
    },

    #[error("Failed to parse question catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read question catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the external collaborators (row store, cache, chat history).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
