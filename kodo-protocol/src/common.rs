use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE: &str = "cpp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Parses the single-string form `"[1,2,3],[4,5,6],expected"`.
    ///
    /// Commas inside brackets do not split. The first two parts form the
    /// input, the third (if any) is the expected output.
    pub fn parse_legacy(s: &str) -> Option<Self> {
        let parts = split_top_level_commas(s);
        if parts.len() < 2 {
            return None;
        }
        let input = format!("{},{}", parts[0], parts[1]);
        let output = parts.get(2).copied().unwrap_or("").to_owned();
        Some(Self { input, output })
    }
}

fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Run,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    #[serde(rename = "Compilation Error")]
    CompilationError,
    #[serde(rename = "Runtime Error")]
    RuntimeError,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "Unsupported Language")]
    UnsupportedLanguage,
    #[serde(rename = "Invalid Input")]
    InvalidInput,
    #[serde(rename = "Internal Error")]
    InternalError,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Accepted => "Accepted",
            ExecutionStatus::WrongAnswer => "Wrong Answer",
            ExecutionStatus::CompilationError => "Compilation Error",
            ExecutionStatus::RuntimeError => "Runtime Error",
            ExecutionStatus::TimeLimitExceeded => "Time Limit Exceeded",
            ExecutionStatus::UnsupportedLanguage => "Unsupported Language",
            ExecutionStatus::InvalidInput => "Invalid Input",
            ExecutionStatus::InternalError => "Internal Error",
        }
    }

    pub fn is_retryable(self) -> bool {
        self == ExecutionStatus::InternalError
    }

    pub fn as_http_status(self) -> StatusCode {
        match self {
            ExecutionStatus::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ExecutionStatus::InvalidInput | ExecutionStatus::UnsupportedLanguage => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::OK,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
