//! Execution adapters: the seam between challenge verification and the external
//! sandboxed-execution service that actually runs submitted code.
//!
//! Two interchangeable backends implement `ExecutionAdapter`:
//! - `Judge0Adapter`: submit per test case, then poll for a terminal status.
//! - `PistonAdapter`: one synchronous execute call per test case.
//!
//! `AppState` holds an `Arc<dyn ExecutionAdapter>`, chosen at startup from
//! `EXECUTION_BACKEND`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{Config, ExecutionBackend};
use crate::models::challenge::TestCase;
use crate::models::submission::TestResult;

pub mod handlers;
pub mod judge0;
pub mod piston;

pub use judge0::Judge0Adapter;
pub use piston::PistonAdapter;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Execution API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Execution did not finish after {attempts} polling attempts")]
    Timeout { attempts: u32 },

    #[error("Malformed execution API response: {0}")]
    InvalidResponse(String),
}

/// Aggregate outcome of running one program against a set of test cases.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub results: Vec<TestResult>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub all_passed: bool,
}

impl ExecutionReport {
    /// `all_passed` is true only when every result passed; an empty run never passes.
    pub fn from_results(results: Vec<TestResult>) -> Self {
        let total_tests = results.len();
        let passed_tests = results.iter().filter(|r| r.passed).count();
        Self {
            all_passed: total_tests > 0 && passed_tests == total_tests,
            results,
            total_tests,
            passed_tests,
        }
    }
}

/// One capability: run `code` against every test case and report per-test results.
///
/// Implementations must not fail the whole run because one test case could not be
/// executed; that test case is recorded as failed instead. A whole-run `Err` is
/// reserved for problems that affect every test case (e.g. an unsupported language).
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn execute(
        &self,
        code: &str,
        language: &str,
        test_cases: &[TestCase],
    ) -> Result<ExecutionReport, ExecutionError>;
}

/// Builds the adapter selected by configuration.
pub fn build_adapter(config: &Config) -> Arc<dyn ExecutionAdapter> {
    match config.execution_backend {
        ExecutionBackend::Judge0 => Arc::new(Judge0Adapter::new(
            config.judge0_url.clone(),
            config.judge0_api_key.clone(),
            config.execution_poll_attempts,
            Duration::from_millis(config.execution_poll_interval_ms),
        )),
        ExecutionBackend::Piston => Arc::new(PistonAdapter::new(config.piston_url.clone())),
    }
}

/// Output comparison used by both backends: surrounding whitespace is ignored.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(passed: bool) -> TestResult {
        TestResult {
            passed,
            ..Default::default()
        }
    }

    #[test]
    fn test_report_all_passed() {
        let report = ExecutionReport::from_results(vec![result(true), result(true)]);
        assert!(report.all_passed);
        assert_eq!(report.total_tests, 2);
        assert_eq!(report.passed_tests, 2);
    }

    #[test]
    fn test_report_one_failure_fails_all() {
        let report = ExecutionReport::from_results(vec![result(true), result(false)]);
        assert!(!report.all_passed);
        assert_eq!(report.passed_tests, 1);
    }

    #[test]
    fn test_report_empty_is_not_passed() {
        let report = ExecutionReport::from_results(vec![]);
        assert!(!report.all_passed);
        assert_eq!(report.total_tests, 0);
    }

    #[test]
    fn test_outputs_match_trims() {
        assert!(outputs_match("42\n", "  42"));
        assert!(!outputs_match("4 2", "42"));
    }
}
