//! Judge0 backend: one submission per test case, then poll until the status id
//! leaves the non-terminal range (1 = In Queue, 2 = Processing).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ExecutionAdapter, ExecutionError, ExecutionReport};
use crate::models::challenge::TestCase;
use crate::models::submission::TestResult;

/// Status id Judge0 reports for an accepted run.
pub const STATUS_ACCEPTED: i32 = 3;
/// Highest non-terminal status id.
const LAST_PENDING_STATUS: i32 = 2;

/// Human-readable description for a Judge0 status id.
pub fn status_description(id: i32) -> &'static str {
    match id {
        1 => "In Queue",
        2 => "Processing",
        3 => "Accepted",
        4 => "Wrong Answer",
        5 => "Time Limit Exceeded",
        6 => "Compilation Error",
        7 => "Runtime Error (SIGSEGV)",
        8 => "Runtime Error (SIGXFSZ)",
        9 => "Runtime Error (SIGFPE)",
        10 => "Runtime Error (SIGABRT)",
        11 => "Runtime Error (NZEC)",
        12 => "Runtime Error (Other)",
        13 => "Internal Error",
        14 => "Exec Format Error",
        _ => "Unknown Status",
    }
}

pub fn is_terminal(status_id: i32) -> bool {
    status_id > LAST_PENDING_STATUS
}

/// Maps a language name to its Judge0 CE language id.
pub fn language_id(language: &str) -> Option<i32> {
    let id = match language.trim().to_ascii_lowercase().as_str() {
        "javascript" | "js" | "node" => 63,
        "typescript" | "ts" => 74,
        "python" | "python3" | "py" => 71,
        "java" => 62,
        "cpp" | "c++" => 54,
        "c" => 50,
        "go" | "golang" => 60,
        "rust" | "rs" => 73,
        "csharp" | "c#" => 51,
        "ruby" => 72,
        _ => return None,
    };
    Some(id)
}

#[derive(Debug, Serialize)]
struct CreateSubmission<'a> {
    source_code: &'a str,
    language_id: i32,
    stdin: &'a str,
    expected_output: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedSubmission {
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Judge0Status {
    pub id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Judge0Submission {
    pub status: Judge0Status,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Judge0Submission {
    /// Converts a terminal submission into a per-test result.
    /// Only status 3 passes; every other terminal id is a failure.
    pub fn into_test_result(self, test_case: &TestCase) -> TestResult {
        let passed = self.status.id == STATUS_ACCEPTED;
        let actual = self.stdout.as_deref().map(|s| s.trim().to_string());
        let error = if passed {
            None
        } else {
            let detail = self
                .compile_output
                .or(self.stderr)
                .or(self.message)
                .filter(|s| !s.trim().is_empty());
            let description = status_description(self.status.id);
            Some(match detail {
                Some(d) => format!("{description}: {}", d.trim()),
                None => description.to_string(),
            })
        };
        TestResult {
            test_name: test_case.name.clone(),
            passed,
            expected: Some(test_case.expected_output.clone()),
            actual,
            error,
        }
    }
}

#[derive(Clone)]
pub struct Judge0Adapter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_attempts: u32,
    poll_interval: Duration,
}

impl Judge0Adapter {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        max_attempts: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_attempts: max_attempts.max(1),
            poll_interval,
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => {
                let host = reqwest::Url::parse(&self.base_url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_default();
                builder
                    .header("X-RapidAPI-Key", key)
                    .header("X-RapidAPI-Host", host)
            }
            None => builder,
        }
    }

    async fn create_submission(
        &self,
        code: &str,
        language_id: i32,
        test_case: &TestCase,
    ) -> Result<String, ExecutionError> {
        let url = format!("{}/submissions?base64_encoded=false&wait=false", self.base_url);
        let response = self
            .request(self.client.post(url))
            .json(&CreateSubmission {
                source_code: code,
                language_id,
                stdin: &test_case.input,
                expected_output: &test_case.expected_output,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecutionError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let created: CreatedSubmission = response
            .json()
            .await
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()))?;
        Ok(created.token)
    }

    async fn fetch_submission(&self, token: &str) -> Result<Judge0Submission, ExecutionError> {
        let url = format!("{}/submissions/{token}?base64_encoded=false", self.base_url);
        let response = self.request(self.client.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecutionError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()))
    }

    /// Waits `poll_interval` then checks, up to `max_attempts` times.
    /// Returns the first terminal submission, or `Timeout` once attempts run out.
    pub async fn wait_for_result(&self, token: &str) -> Result<Judge0Submission, ExecutionError> {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.poll_interval).await;
            let submission = self.fetch_submission(token).await?;
            if is_terminal(submission.status.id) {
                return Ok(submission);
            }
            debug!(
                "Judge0 token {token} still {} (attempt {attempt}/{})",
                status_description(submission.status.id),
                self.max_attempts
            );
        }
        Err(ExecutionError::Timeout {
            attempts: self.max_attempts,
        })
    }

    async fn run_test_case(
        &self,
        code: &str,
        language_id: i32,
        test_case: &TestCase,
    ) -> Result<TestResult, ExecutionError> {
        let token = self.create_submission(code, language_id, test_case).await?;
        let submission = self.wait_for_result(&token).await?;
        Ok(submission.into_test_result(test_case))
    }
}

#[async_trait]
impl ExecutionAdapter for Judge0Adapter {
    fn backend_name(&self) -> &'static str {
        "judge0"
    }

    async fn execute(
        &self,
        code: &str,
        language: &str,
        test_cases: &[TestCase],
    ) -> Result<ExecutionReport, ExecutionError> {
        let language_id = language_id(language)
            .ok_or_else(|| ExecutionError::UnsupportedLanguage(language.to_string()))?;

        let mut results = Vec::with_capacity(test_cases.len());
        for test_case in test_cases {
            let result = match self.run_test_case(code, language_id, test_case).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Judge0 test case '{}' failed to execute: {e}", test_case.name);
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
