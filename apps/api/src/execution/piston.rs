//! Piston backend: a single synchronous execute call per test case, with the test
//! input on stdin. The verdict is decided locally from stdout and stderr.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{outputs_match, ExecutionAdapter, ExecutionError, ExecutionReport};
use crate::models::challenge::TestCase;
use crate::models::submission::TestResult;

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<SourceFile<'a>>,
    stdin: &'a str,
}

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    content: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    pub run: StageOutput,
    #[serde(default)]
    pub compile: Option<StageOutput>,
}

impl ExecuteResponse {
    /// The first non-empty error stream, compile stage first.
    fn error_stream(&self) -> Option<&str> {
        self.compile
            .as_ref()
            .map(|c| c.stderr.as_str())
            .filter(|s| !s.trim().is_empty())
            .or_else(|| Some(self.run.stderr.as_str()).filter(|s| !s.trim().is_empty()))
    }

    /// Passes only when trimmed stdout equals the trimmed expected output and no
    /// error stream was reported.
    pub fn into_test_result(self, test_case: &TestCase) -> TestResult {
        let error = self.error_stream().map(|s| s.trim().to_string());
        let passed = error.is_none() && outputs_match(&self.run.stdout, &test_case.expected_output);
        TestResult {
            test_name: test_case.name.clone(),
            passed,
            expected: Some(test_case.expected_output.trim().to_string()),
            actual: Some(self.run.stdout.trim().to_string()),
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PistonError {
    message: String,
}

#[derive(Clone)]
pub struct PistonAdapter {
    client: Client,
    base_url: String,
}

impl PistonAdapter {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn run_test_case(
        &self,
        code: &str,
        language: &str,
        test_case: &TestCase,
    ) -> Result<TestResult, ExecutionError> {
        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(&ExecuteRequest {
                language,
                version: "*",
                files: vec![SourceFile { content: code }],
                stdin: &test_case.input,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PistonError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ExecutionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let output: ExecuteResponse = response
            .json()
            .await
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()))?;
        Ok(output.into_test_result(test_case))
    }
}

#[async_trait]
impl ExecutionAdapter for PistonAdapter {
    fn backend_name(&self) -> &'static str {
        "piston"
    }

    async fn execute(
        &self,
        code: &str,
        language: &str,
        test_cases: &[TestCase],
    ) -> Result<ExecutionReport, ExecutionError> {
        let language = language.trim().to_ascii_lowercase();
        let mut results = Vec::with_capacity(test_cases.len());
        for test_case in test_cases {
            let result = match self.run_test_case(code, &language, test_case).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Piston test case '{}' failed to execute: {e}", test_case.name);
                    TestResult::failed_with_error(
                        &test_case.name,
                        &test_case.expected_output,
                        e.to_string(),
                    )
                }
            };
            results.push(result);
        }
        Ok(ExecutionReport::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_fake_service;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn tc(name: &str, input: &str, expected: &str) -> TestCase {
        TestCase {
            name: name.to_string(),
            input: input.to_string(),
            expected_output: expected.to_string(),
            hidden: false,
        }
    }

    /// Fake Piston: stdin selects the behavior.
    fn fake_piston() -> Router {
        Router::new().route(
            "/execute",
            post(|Json(body): Json<Value>| async move {
                let stdin = body["stdin"].as_str().unwrap_or_default();
                let run = match stdin {
                    "echo" => json!({"stdout": "hello\n", "stderr": "", "code": 0}),
                    "warn" => json!({"stdout": "hello\n", "stderr": "DeprecationWarning", "code": 0}),
                    "crash" => {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({"message": "runtime unavailable"})),
                        )
                    }
                    _ => json!({"stdout": "", "stderr": "", "code": 0}),
                };
                (StatusCode::OK, Json(json!({"language": "python", "version": "3.10.0", "run": run})))
            }),
        )
    }

    #[test]
    fn test_stderr_forces_failure_even_if_stdout_matches() {
        let resp = ExecuteResponse {
            run: StageOutput {
                stdout: "42".into(),
                stderr: "warning: unused".into(),
            },
            compile: None,
        };
        let result = resp.into_test_result(&tc("t", "", "42"));
        assert!(!result.passed);
        assert_eq!(result.error.as_deref(), Some("warning: unused"));
    }

    #[test]
    fn test_compile_stderr_is_an_error_stream() {
        let resp = ExecuteResponse {
            run: StageOutput::default(),
            compile: Some(StageOutput {
                stderr: "main.c:1: error".into(),
                ..Default::default()
            }),
        };
        let result = resp.into_test_result(&tc("t", "", ""));
        assert!(!result.passed);
        assert_eq!(result.error.as_deref(), Some("main.c:1: error"));
    }

    #[test]
    fn test_trimmed_stdout_match_passes() {
        let resp = ExecuteResponse {
            run: StageOutput {
                stdout: "  42\n".into(),
                ..Default::default()
            },
            compile: None,
        };
        assert!(resp.into_test_result(&tc("t", "", "42\n")).passed);
    }

    #[tokio::test]
    async fn test_execute_against_fake_service() {
        let base = spawn_fake_service(fake_piston()).await;
        let adapter = PistonAdapter::new(base);
        let report = adapter
            .execute(
                "print(input())",
                "Python",
                &[
                    tc("echo", "echo", "hello"),
                    tc("warn", "warn", "hello"),
                    tc("crash", "crash", "hello"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.total_tests, 3);
        assert_eq!(report.passed_tests, 1);
        assert!(!report.all_passed);
        assert!(report.results[0].passed);
        assert!(!report.results[1].passed);
        assert!(!report.results[2].passed);
        assert!(report.results[2]
            .error
            .as_deref()
            .unwrap()
            .contains("runtime unavailable"));
    }
}
