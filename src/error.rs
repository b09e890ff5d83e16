use crate::game::PlayerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    /// Advisor wiring invoked before the controlled player was resolved.
    #[error("controlled player not bound yet")]
    PlayerNotBound,

    #[error("player {0} owns no missile silo")]
    MissingSilo(PlayerId),

    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AiError>;
