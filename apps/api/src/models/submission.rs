use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle: `Pending -> Running -> {Passed | Failed | Error}`.
/// Client-verified submissions are created directly in a terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Error,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Error => "Error",
        }
    }

    pub fn from_verdict(passed: bool) -> Self {
        if passed {
            Self::Passed
        } else {
            Self::Failed
        }
    }

    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Error)
                | (Self::Running, Self::Passed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Error)
        )
    }
}

/// Per-test-case outcome, persisted as `{testName, passed, expected, actual, error}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(default)]
    pub test_name: String,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub actual: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TestResult {
    pub fn failed_with_error(test_name: &str, expected: &str, error: impl Into<String>) -> Self {
        Self {
            test_name: test_name.to_string(),
            passed: false,
            expected: Some(expected.to_string()),
            actual: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub code: String,
    pub language: String,
    pub status: String,
    pub results: Json<Vec<TestResult>>,
    pub execution_time_ms: Option<f64>,
    pub badge_awarded: bool,
    pub badge_awarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_verdict_only() {
        assert_eq!(SubmissionStatus::from_verdict(true), SubmissionStatus::Passed);
        assert_eq!(SubmissionStatus::from_verdict(false), SubmissionStatus::Failed);
    }

    #[test]
    fn test_lifecycle_transitions() {
        use SubmissionStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Passed));
        assert!(Running.can_transition_to(Error));
        assert!(!Pending.can_transition_to(Passed));
        assert!(!Passed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Running));
        assert!(!Error.can_transition_to(Running));
    }

    #[test]
    fn test_result_accepts_minimal_client_shape() {
        let r: TestResult = serde_json::from_str(r#"{"passed":true}"#).unwrap();
        assert!(r.passed);
        assert!(r.test_name.is_empty());
        assert!(r.error.is_none());
    }

    #[test]
    fn test_result_wire_shape() {
        let r = TestResult::failed_with_error("t1", "42", "boom");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["testName"], "t1");
        assert_eq!(v["expected"], "42");
        assert_eq!(v["error"], "boom");
        assert_eq!(v["passed"], false);
    }
}
