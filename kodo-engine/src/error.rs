use kodo_protocol::common::ExecutionStatus;
use kodo_protocol::error::ErrorCode;

use std::time::Duration;

/// Reasons a request produced no verdict.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Unsupported language: {language}. Supported languages are: {supported}.")]
    UnsupportedLanguage { language: String, supported: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("A request with id {0} is already in flight.")]
    DuplicateRequest(String),

    #[error("The execution queue is full ({depth} requests waiting). Try again later.")]
    CapacityExceeded { depth: usize },

    #[error("The request waited {waited:?} in the queue (limit {limit:?}). Try again later.")]
    QueueTimeout { waited: Duration, limit: Duration },

    #[error("The engine is shutting down.")]
    ShuttingDown,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub fn status(&self) -> ExecutionStatus {
        match self {
            EngineError::UnsupportedLanguage { .. } => ExecutionStatus::UnsupportedLanguage,
            EngineError::InvalidInput(_) | EngineError::DuplicateRequest(_) => {
                ExecutionStatus::InvalidInput
            }
            EngineError::CapacityExceeded { .. }
            | EngineError::QueueTimeout { .. }
            | EngineError::ShuttingDown
            | EngineError::Internal(_) => ExecutionStatus::InternalError,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::UnsupportedLanguage { .. } => ErrorCode::UnsupportedLanguage,
            EngineError::InvalidInput(_) | EngineError::DuplicateRequest(_) => {
                ErrorCode::InvalidRequest
            }
            EngineError::CapacityExceeded { .. } | EngineError::ShuttingDown => {
                ErrorCode::CapacityExceeded
            }
            EngineError::QueueTimeout { .. } => ErrorCode::QueueTimeout,
            EngineError::Internal(_) => ErrorCode::UnknownError,
        }
    }
}
