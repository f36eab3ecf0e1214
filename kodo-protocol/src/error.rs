use http::StatusCode;
use serde::{Deserialize, Serialize};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    UnknownError = 1000,
    InvalidRequest = 1002,
    UnsupportedLanguage = 1005,
    CapacityExceeded = 1006,
    QueueTimeout = 1007,
}

impl ErrorCode {
    pub fn as_status(self) -> StatusCode {
        match self {
            ErrorCode::UnknownError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::UnsupportedLanguage => StatusCode::BAD_REQUEST,
            ErrorCode::CapacityExceeded => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::QueueTimeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Request body must be a JSON object.")]
    NotAnObject,

    #[error("Code must be a string.")]
    CodeNotString,

    #[error("Language must be a string.")]
    LanguageNotString,

    #[error("Mode must be \"run\" or \"submit\".")]
    InvalidMode,

    #[error("Test cases must be an array.")]
    TestCasesNotArray,

    #[error("Unparseable test case at index {index}.")]
    InvalidTestCase { index: usize },

    #[error("Invalid request: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
