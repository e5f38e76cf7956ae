//! Axum route handlers for challenges and client-verified submissions.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::challenges::find_challenge;
use crate::challenges::stats::ChallengeStats;
use crate::challenges::submission::{record_client_verdict, NewSubmission};
use crate::errors::AppError;
use crate::extractors::AppJson;
use crate::models::challenge::{ChallengeRow, Difficulty};
use crate::models::submission::{SubmissionRow, TestResult};
use crate::response::ApiResponse;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChallengeListQuery {
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub difficulty: String,
    pub language: String,
    pub stats: ChallengeStats,
}

impl From<ChallengeRow> for ChallengeSummary {
    fn from(row: ChallengeRow) -> Self {
        Self {
            stats: ChallengeStats::new(row.total_attempts, row.total_passes),
            id: row.id,
            slug: row.slug,
            title: row.title,
            difficulty: row.difficulty,
            language: row.language,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDetail {
    #[serde(flatten)]
    pub challenge: ChallengeRow,
    pub stats: ChallengeStats,
}

/// Body of a client-verified submission. `challengeId` accepts a slug or a UUID.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub challenge_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub results: Vec<TestResult>,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub execution_time_ms: Option<f64>,
}

/// Required fields of a `SubmitRequest`, checked before any lookup.
pub fn validate_submit_request(req: &SubmitRequest) -> Result<(&str, &str), AppError> {
    let challenge_key = req
        .challenge_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("challengeId is required".to_string()))?;
    let code = req
        .code
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("code is required".to_string()))?;
    if let Some(ms) = req.execution_time_ms {
        if !ms.is_finite() || ms < 0.0 {
            return Err(AppError::Validation(
                "executionTimeMs must be a non-negative number".to_string(),
            ));
        }
    }
    Ok((challenge_key, code))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/challenges
pub async fn handle_list_challenges(
    State(state): State<AppState>,
    Query(query): Query<ChallengeListQuery>,
) -> Result<ApiResponse<Vec<ChallengeSummary>>, AppError> {
    let rows = sqlx::query_as::<_, ChallengeRow>(
        r#"
        SELECT * FROM challenges
        WHERE ($1::text IS NULL OR difficulty = $1)
        ORDER BY created_at ASC
        "#,
    )
    .bind(query.difficulty.map(|d| d.as_str()))
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/challenges/:key
///
/// Hidden test cases are redacted unless the caller is an admin.
pub async fn handle_get_challenge(
    State(state): State<AppState>,
    Path(key): Path<String>,
    auth: Option<AuthUser>,
) -> Result<ApiResponse<ChallengeDetail>, AppError> {
    let challenge = find_challenge(&state.db, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {key} not found")))?;

    let is_admin = auth.map(|a| a.admin).unwrap_or(false);
    let challenge = if is_admin {
        challenge
    } else {
        challenge.redact_hidden()
    };

    Ok(ApiResponse::ok(ChallengeDetail {
        stats: ChallengeStats::new(challenge.total_attempts, challenge.total_passes),
        challenge,
    }))
}

/// POST /api/v1/challenges/submit
///
/// Persists a verdict the client computed itself; no code is executed here.
pub async fn handle_submit(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<SubmitRequest>,
) -> Result<ApiResponse<SubmissionRow>, AppError> {
    let user_id = auth.require_student()?;
    let (challenge_key, code) = validate_submit_request(&req)?;

    let challenge = find_challenge(&state.db, challenge_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {challenge_key} not found")))?;

    let language = req
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&challenge.language);

    let submission = record_client_verdict(
        &state.db,
        NewSubmission {
            user_id,
            challenge_id: challenge.id,
            code,
            language,
        },
        req.results.clone(),
        req.passed,
        req.execution_time_ms,
    )
    .await?;

    let message = if submission.badge_awarded {
        "Challenge passed, badge awarded"
    } else if submission.status == "Passed" {
        "Challenge passed"
    } else {
        "Submission recorded"
    };
    Ok(ApiResponse::created(submission).with_message(message))
}

/// GET /api/v1/challenges/submissions/mine
pub async fn handle_list_my_submissions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<SubmissionRow>>, AppError> {
    let user_id = auth.require_student()?;
    let rows = sqlx::query_as::<_, SubmissionRow>(
        "SELECT * FROM submissions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 100",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(ApiResponse::ok(rows))
}

/// GET /api/v1/challenges/submissions/:id
pub async fn handle_get_submission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<SubmissionRow>, AppError> {
    let row = sqlx::query_as::<_, SubmissionRow>("SELECT * FROM submissions WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    if row.user_id != auth.id && !auth.admin {
        return Err(AppError::Forbidden);
    }
    Ok(ApiResponse::ok(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(challenge_id: Option<&str>, code: Option<&str>) -> SubmitRequest {
        SubmitRequest {
            challenge_id: challenge_id.map(str::to_string),
            code: code.map(str::to_string),
            language: None,
            results: vec![],
            passed: true,
            execution_time_ms: None,
        }
    }

    #[test]
    fn test_missing_challenge_id_rejected() {
        assert!(matches!(
            validate_submit_request(&req(None, Some("x"))),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_submit_request(&req(Some("  "), Some("x"))),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_code_rejected() {
        assert!(matches!(
            validate_submit_request(&req(Some("two-fer"), Some("   "))),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_valid_request_trims_key() {
        let r = req(Some(" two-fer "), Some("print()"));
        let (key, code) = validate_submit_request(&r).unwrap();
        assert_eq!(key, "two-fer");
        assert_eq!(code, "print()");
    }

    #[test]
    fn test_minimal_client_body_parses() {
        let body = r#"{"challengeId":"two-fer","code":"...","results":[{"passed":true}],"passed":true}"#;
        let r: SubmitRequest = serde_json::from_str(body).unwrap();
        assert!(r.passed);
        assert_eq!(r.results.len(), 1);
        assert!(validate_submit_request(&r).is_ok());
    }
}
