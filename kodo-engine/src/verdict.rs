use kodo_protocol::common::{ExecutionStatus, TestCase};
use kodo_protocol::external::TestResultInfo;
use kodo_sandbox::RunOutcome;

use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub passed: bool,
    pub verdict: ExecutionStatus,
    pub outcome: RunOutcome,
}

impl TestResult {
    pub fn to_info(&self) -> TestResultInfo {
        TestResultInfo {
            input: self.input.clone(),
            expected_output: self.expected_output.clone(),
            actual_output: self.actual_output.clone(),
            passed: self.passed,
            verdict: self.verdict,
            exit_code: self.outcome.exit_code,
            timed_out: self.outcome.timed_out,
            stderr: self.outcome.stderr.clone(),
            time: self.outcome.real_time,
        }
    }
}

/// Trailing whitespace is ignored on both sides. Leading whitespace and
/// interior whitespace are significant.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim_end() == expected.trim_end()
}

/// Timeouts win over exit codes, exit codes win over output comparison.
/// Output cut off at the capture limit never matches.
pub fn classify(outcome: &RunOutcome, expected: &str) -> ExecutionStatus {
    if outcome.timed_out {
        ExecutionStatus::TimeLimitExceeded
    } else if !outcome.is_success() {
        ExecutionStatus::RuntimeError
    } else if outcome.stdout_truncated || !outputs_match(&outcome.stdout, expected) {
        ExecutionStatus::WrongAnswer
    } else {
        ExecutionStatus::Accepted
    }
}

pub fn judge_case(case: &TestCase, outcome: RunOutcome) -> TestResult {
    let verdict = classify(&outcome, &case.output);
    TestResult {
        input: case.input.clone(),
        expected_output: case.output.clone(),
        actual_output: outcome.stdout.trim_end().to_owned(),
        passed: verdict == ExecutionStatus::Accepted,
        verdict,
        outcome,
    }
}

/// The verdict of the first failing case, or `Accepted`.
pub fn aggregate(results: &[TestResult]) -> ExecutionStatus {
    results
        .iter()
        .find(|r| !r.passed)
        .map(|r| r.verdict)
        .unwrap_or(ExecutionStatus::Accepted)
}

/// Trimmed stdout and stderr joined by a newline.
pub fn combined_output(outcome: &RunOutcome) -> String {
    let stdout = outcome.stdout.trim();
    let stderr = outcome.stderr.trim();
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, true) => stdout.to_owned(),
        (true, false) => stderr.to_owned(),
        (false, false) => format!("{}\n{}", stdout, stderr),
    }
}

pub fn time_limit_message(limit: Duration) -> String {
    format!(
        "Time limit exceeded: the program ran longer than {} ms.",
        limit.as_millis()
    )
}

/// User-facing explanation of a failed case.
pub fn diagnostic(result: &TestResult, run_timeout: Duration) -> Option<String> {
    match result.verdict {
        ExecutionStatus::TimeLimitExceeded => Some(time_limit_message(run_timeout)),
        ExecutionStatus::RuntimeError => {
            let output = combined_output(&result.outcome);
            if output.is_empty() {
                Some(format!(
                    "Runtime error: the program exited with code {}.",
                    result.outcome.exit_code
                ))
            } else {
                Some(output)
            }
        }
        ExecutionStatus::WrongAnswer => Some("Your solution produced incorrect results.".into()),
        _ => None,
    }
}
