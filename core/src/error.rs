use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Insufficient {resource}: have {have}, need {need}")]
    InsufficientResource {
        resource: &'static str,
        have: i64,
        need: i64,
    },

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Account incapacitated until {until}")]
    Incapacitated { until: crate::types::Timestamp },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GameError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;
