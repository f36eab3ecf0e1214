//! Shapes exchanged with the routing layer.

use crate::common::{ExecutionStatus, Mode, TestCase, DEFAULT_LANGUAGE};
use crate::error::{ErrorCode, ParseError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[validate(length(min = 1, max = 128))]
    pub request_id: Option<String>,

    #[validate(length(min = 1, max = 32))]
    pub language: String,

    pub code: String,

    pub test_cases: Vec<TestCase>,

    pub mode: Mode,
}

impl ExecuteRequest {
    /// Parses an untyped request body.
    ///
    /// `language` defaults to `cpp` and `mode` to `run`. Test cases may be
    /// objects or legacy strings (see [`TestCase::parse_legacy`]).
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let obj = value.as_object().ok_or(ParseError::NotAnObject)?;

        let code = match obj.get("code") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(ParseError::CodeNotString),
        };

        let language = match obj.get("language") {
            None | Some(Value::Null) => DEFAULT_LANGUAGE.to_owned(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(ParseError::LanguageNotString),
        };

        let mode = match obj.get("mode") {
            None | Some(Value::Null) => Mode::default(),
            Some(v) => Mode::deserialize(v).map_err(|_| ParseError::InvalidMode)?,
        };

        let test_cases = match obj.get("testCases") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    parse_test_case(item).ok_or(ParseError::InvalidTestCase { index })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ParseError::TestCasesNotArray),
        };

        let request_id = match obj.get("requestId") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };

        let req = Self {
            request_id,
            language,
            code,
            test_cases,
            mode,
        };
        req.validate()?;
        Ok(req)
    }
}

fn parse_test_case(item: &Value) -> Option<TestCase> {
    match item {
        Value::String(s) => TestCase::parse_legacy(s),
        Value::Object(obj) => match (obj.get("input"), obj.get("output")) {
            (Some(Value::String(input)), Some(Value::String(output))) => {
                Some(TestCase::new(input.as_str(), output.as_str()))
            }
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Absent for a clean raw run, which is an echo rather than a verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_results: Option<Vec<TestResultInfo>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultInfo {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub passed: bool,
    pub verdict: ExecutionStatus,
    pub exit_code: i32,
    pub timed_out: bool,
    pub stderr: String,
    pub time: u64, // milliseconds
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn defaults_language_and_mode() {
        let req = ExecuteRequest::from_value(&json!({ "code": "int main(){}" })).unwrap();
        assert_eq!(req.language, "cpp");
        assert_eq!(req.mode, Mode::Run);
        assert!(req.test_cases.is_empty());
        assert!(req.request_id.is_none());
    }

    #[test]
    fn code_must_be_a_string() {
        let err = ExecuteRequest::from_value(&json!({ "code": 42 })).unwrap_err();
        assert!(matches!(err, ParseError::CodeNotString));
        assert_eq!(err.to_string(), "Code must be a string.");
    }

    #[test]
    fn mixed_test_case_forms() {
        let body = json!({
            "language": "Python",
            "code": "print(input())",
            "mode": "submit",
            "testCases": [
                { "input": "1\n", "output": "1\n" },
                "[1,2],[3,4],[1,2,3,4]"
            ]
        });
        let req = ExecuteRequest::from_value(&body).unwrap();
        assert_eq!(req.mode, Mode::Submit);
        assert_eq!(req.language, "Python");
        assert_eq!(req.test_cases.len(), 2);
        assert_eq!(req.test_cases[1].input, "[1,2],[3,4]");
        assert_eq!(req.test_cases[1].output, "[1,2,3,4]");
    }

    #[test]
    fn rejects_bad_test_case() {
        let body = json!({ "code": "", "testCases": [ { "input": 1 } ] });
        let err = ExecuteRequest::from_value(&body).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTestCase { index: 0 }));
    }

    #[test]
    fn rejects_bad_mode_and_empty_language() {
        let err = ExecuteRequest::from_value(&json!({ "code": "", "mode": "debug" })).unwrap_err();
        assert!(matches!(err, ParseError::InvalidMode));

        let err = ExecuteRequest::from_value(&json!({ "code": "", "language": "" })).unwrap_err();
        assert!(matches!(err, ParseError::Invalid(_)));
    }

    #[test]
    fn response_omits_empty_fields() {
        let res = ExecuteResponse {
            status: Some(ExecutionStatus::Accepted),
            output: Some("4".into()),
            ..ExecuteResponse::default()
        };
        let v = serde_json::to_value(&res).unwrap();
        assert_eq!(v, json!({ "status": "Accepted", "output": "4" }));
    }
}
