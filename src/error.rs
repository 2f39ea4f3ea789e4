use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("learner not found: {0}")]
    LearnerNotFound(String),
    #[error("score must be a finite value in [0, 1], got {0}")]
    ScoreOutOfRange(f64),
}

pub type Result<T> = std::result::Result<T, EngineError>;
