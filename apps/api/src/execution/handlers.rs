//! Server-side verification endpoints backed by the configured `ExecutionAdapter`.

use std::time::Instant;

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::challenges::find_challenge;
use crate::challenges::submission::{create_pending, finalize, mark_error, mark_running, NewSubmission};
use crate::errors::AppError;
use crate::execution::ExecutionReport;
use crate::extractors::AppJson;
use crate::models::submission::SubmissionRow;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(default)]
    pub challenge_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl ExecuteRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.challenge_id.trim().is_empty() {
            return Err(AppError::Validation("challengeId is required".to_string()));
        }
        if self.code.trim().is_empty() {
            return Err(AppError::Validation("code is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub backend: &'static str,
    #[serde(flatten)]
    pub report: ExecutionReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSubmissionResponse {
    pub submission: SubmissionRow,
    pub total_tests: usize,
    pub passed_tests: usize,
}

/// POST /api/v1/execute/run
///
/// Runs code against the challenge's visible test cases. Nothing is persisted.
pub async fn handle_run(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<ExecuteRequest>,
) -> Result<ApiResponse<RunResponse>, AppError> {
    auth.require_student()?;
    req.validate()?;

    let challenge = find_challenge(&state.db, &req.challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", req.challenge_id)))?;
    let language = req.language.as_deref().unwrap_or(&challenge.language);

    let report = state
        .executor
        .execute(&req.code, language, &challenge.visible_test_cases())
        .await?;

    Ok(ApiResponse::ok(RunResponse {
        backend: state.executor.backend_name(),
        report,
    }))
}

/// Stored on the submission when persistence fails mid-lifecycle.
const INTERRUPTED: &str = "Submission could not be processed";

/// Parks a submission that cannot reach a verdict in `Error`, then returns `err`
/// so the caller still sees the original failure.
async fn abandon(state: &AppState, submission_id: Uuid, message: &str, err: AppError) -> AppError {
    if let Err(mark_err) = mark_error(&state.db, submission_id, message).await {
        warn!("Submission {submission_id} could not be marked as errored: {mark_err}");
    }
    err
}

/// POST /api/v1/execute/submit
///
/// Pending -> Running -> Passed/Failed, or Error when the adapter cannot run the
/// code at all. Polling blocks this request until every test case is terminal.
pub async fn handle_verified_submit(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<ExecuteRequest>,
) -> Result<ApiResponse<VerifiedSubmissionResponse>, AppError> {
    let user_id = auth.require_student()?;
    req.validate()?;

    let challenge = find_challenge(&state.db, &req.challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", req.challenge_id)))?;
    let language = req
        .language
        .clone()
        .unwrap_or_else(|| challenge.language.clone());

    let pending = create_pending(
        &state.db,
        NewSubmission {
            user_id,
            challenge_id: challenge.id,
            code: &req.code,
            language: &language,
        },
    )
    .await?;
    if let Err(e) = mark_running(&state.db, pending.id).await {
        return Err(abandon(&state, pending.id, INTERRUPTED, e).await);
    }

    info!(
        "Verifying submission {} with {} ({} test cases)",
        pending.id,
        state.executor.backend_name(),
        challenge.test_cases.len()
    );

    let started = Instant::now();
    let report = match state
        .executor
        .execute(&req.code, &language, &challenge.test_cases)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            error!("Submission {} could not be executed: {e}", pending.id);
            let message = e.to_string();
            return Err(abandon(&state, pending.id, &message, AppError::Execution(e)).await);
        }
    };
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let submission = match finalize(
        &state.db,
        pending.id,
        report.results,
        report.all_passed,
        Some(elapsed_ms),
    )
    .await
    {
        Ok(submission) => submission,
        Err(e) => return Err(abandon(&state, pending.id, INTERRUPTED, e).await),
    };

    Ok(ApiResponse::created(VerifiedSubmissionResponse {
        submission,
        total_tests: report.total_tests,
        passed_tests: report.passed_tests,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::auth::{sign_token, PrincipalKind};
    use crate::config::ExecutionBackend;
    use crate::execution::build_adapter;
    use crate::routes::build_router;
    use crate::test_support::{
        live_pool, seed_challenge, seed_student, test_config, test_state, TEST_JWT_SECRET,
    };

    #[test]
    fn test_request_validation() {
        let req = ExecuteRequest {
            challenge_id: "two-fer".into(),
            code: "  ".into(),
            language: None,
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unsupported_language_ends_in_error() {
        let Some(pool) = live_pool().await else {
            return;
        };
        let user_id = seed_student(&pool).await;
        let (challenge_id, slug) = seed_challenge(&pool, "cobol").await;

        let mut config = test_config();
        config.execution_backend = ExecutionBackend::Judge0;
        let mut state = test_state();
        state.executor = build_adapter(&config);
        state.db = pool.clone();

        let token = sign_token(user_id, PrincipalKind::Student, false, TEST_JWT_SECRET, 1).unwrap();
        let resp = build_router(state)
            .oneshot(
                Request::post("/api/v1/execute/submit")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({"challengeId": slug, "code": "DISPLAY 'HI'."})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "EXECUTION_ERROR");

        let statuses: Vec<String> = sqlx::query_scalar(
            "SELECT status FROM submissions WHERE user_id = $1 AND challenge_id = $2",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(statuses, vec!["Error".to_string()]);

        let attempts: i64 =
            sqlx::query_scalar("SELECT total_attempts FROM challenges WHERE id = $1")
                .bind(challenge_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(attempts, 0);
    }
}
