use crate::error::EngineError;
use crate::verdict::{self, TestResult};

use kodo_protocol::common::{ExecutionStatus, Mode, TestCase};
use kodo_protocol::error::ErrorCode;
use kodo_protocol::external::{ExecuteRequest, ExecuteResponse};
use kodo_sandbox::RunOutcome;

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub request_id: String,
    pub language: String,
    pub source_code: String,
    pub test_cases: Vec<TestCase>,
    pub mode: Mode,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, source_code: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            language: language.into(),
            source_code: source_code.into(),
            test_cases: Vec::new(),
            mode: Mode::Run,
        }
    }

    pub fn with_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_cases(mut self, mode: Mode, test_cases: Vec<TestCase>) -> Self {
        self.mode = mode;
        self.test_cases = test_cases;
        self
    }
}

impl From<ExecuteRequest> for ExecutionRequest {
    fn from(req: ExecuteRequest) -> Self {
        Self {
            request_id: req
                .request_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            language: req.language,
            source_code: req.code,
            test_cases: req.test_cases,
            mode: req.mode,
        }
    }
}

/// Final answer for one request.
///
/// `status` is `None` only for a raw run that exited cleanly, where the
/// program output is the whole answer.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub request_id: String,
    pub status: Option<ExecutionStatus>,
    pub code: Option<ErrorCode>,
    pub raw_output: Option<String>,
    pub errors: Option<String>,
    pub test_results: Vec<TestResult>,
}

impl ExecutionResult {
    fn empty(request_id: &str, status: Option<ExecutionStatus>) -> Self {
        Self {
            request_id: request_id.to_owned(),
            status,
            code: None,
            raw_output: None,
            errors: None,
            test_results: Vec::new(),
        }
    }

    pub fn rejected(request_id: &str, err: &EngineError) -> Self {
        Self {
            code: Some(err.code()),
            errors: Some(err.to_string()),
            ..Self::empty(request_id, Some(err.status()))
        }
    }

    pub fn compilation_error(request_id: &str, message: String) -> Self {
        Self {
            errors: Some(message),
            ..Self::empty(request_id, Some(ExecutionStatus::CompilationError))
        }
    }

    /// A run without test cases: the output is echoed back.
    pub fn raw_run(request_id: &str, outcome: &RunOutcome, run_timeout: Duration) -> Self {
        let output = verdict::combined_output(outcome);
        let (status, errors) = if outcome.timed_out {
            (
                Some(ExecutionStatus::TimeLimitExceeded),
                Some(verdict::time_limit_message(run_timeout)),
            )
        } else if outcome.exit_code != 0 {
            (Some(ExecutionStatus::RuntimeError), Some(output.clone()))
        } else {
            (None, None)
        };
        Self {
            raw_output: Some(output),
            errors,
            ..Self::empty(request_id, status)
        }
    }

    pub fn judged(request_id: &str, test_results: Vec<TestResult>, run_timeout: Duration) -> Self {
        let status = verdict::aggregate(&test_results);
        let errors = test_results
            .iter()
            .find(|r| !r.passed)
            .and_then(|r| verdict::diagnostic(r, run_timeout));
        Self {
            errors,
            test_results,
            ..Self::empty(request_id, Some(status))
        }
    }

    pub fn to_response(&self) -> ExecuteResponse {
        let test_results = if self.test_results.is_empty() {
            None
        } else {
            Some(self.test_results.iter().map(TestResult::to_info).collect())
        };
        ExecuteResponse {
            request_id: Some(self.request_id.clone()).filter(|id| !id.is_empty()),
            status: self.status,
            code: self.code,
            output: self.raw_output.clone(),
            errors: self.errors.clone(),
            test_results,
        }
    }
}
