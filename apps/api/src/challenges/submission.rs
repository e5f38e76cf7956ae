//! Submission persistence.
//!
//! Two entry points share the same finalization step:
//! - `record_client_verdict`: the client already ran the tests; the row is created
//!   directly in `Passed`/`Failed` from the supplied flag.
//! - `create_pending` + `mark_running` + `finalize`: server-side verification
//!   through an `ExecutionAdapter`.
//!
//! Finalization runs in one transaction: set the terminal status, bump the
//! challenge counters, and award the badge on a pass.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::challenges::badges::award_badge;
use crate::challenges::stats::record_attempt;
use crate::errors::AppError;
use crate::models::submission::{SubmissionRow, SubmissionStatus, TestResult};

pub struct NewSubmission<'a> {
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub code: &'a str,
    pub language: &'a str,
}

/// Gives unnamed client-side results a stable `Test N` name.
pub fn name_results(results: Vec<TestResult>) -> Vec<TestResult> {
    results
        .into_iter()
        .enumerate()
        .map(|(i, mut r)| {
            if r.test_name.trim().is_empty() {
                r.test_name = format!("Test {}", i + 1);
            }
            r
        })
        .collect()
}

/// Persists a client-verified submission. Status is `Passed` iff `passed`,
/// independent of what the individual results say.
pub async fn record_client_verdict(
    pool: &PgPool,
    new: NewSubmission<'_>,
    results: Vec<TestResult>,
    passed: bool,
    execution_time_ms: Option<f64>,
) -> Result<SubmissionRow, AppError> {
    let status = SubmissionStatus::from_verdict(passed);
    let mut tx = pool.begin().await?;

    let submission = sqlx::query_as::<_, SubmissionRow>(
        r#"
        INSERT INTO submissions
            (id, user_id, challenge_id, code, language, status, results, execution_time_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.challenge_id)
    .bind(new.code)
    .bind(new.language)
    .bind(status.as_str())
    .bind(Json(name_results(results)))
    .bind(execution_time_ms)
    .fetch_one(&mut *tx)
    .await?;

    let submission = apply_verdict(&mut tx, submission, status).await?;
    tx.commit().await?;
    Ok(submission)
}

/// Creates a `Pending` submission awaiting server-side execution.
pub async fn create_pending(
    pool: &PgPool,
    new: NewSubmission<'_>,
) -> Result<SubmissionRow, AppError> {
    Ok(sqlx::query_as::<_, SubmissionRow>(
        r#"
        INSERT INTO submissions (id, user_id, challenge_id, code, language, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.challenge_id)
    .bind(new.code)
    .bind(new.language)
    .bind(SubmissionStatus::Pending.as_str())
    .fetch_one(pool)
    .await?)
}

/// Moves a submission from `Pending` to `Running`.
pub async fn mark_running(pool: &PgPool, submission_id: Uuid) -> Result<(), AppError> {
    transition(pool, submission_id, SubmissionStatus::Pending, SubmissionStatus::Running).await
}

/// Moves a `Pending` or `Running` submission to `Error`. Counters and badges are untouched.
pub async fn mark_error(pool: &PgPool, submission_id: Uuid, message: &str) -> Result<(), AppError> {
    let results = vec![TestResult {
        test_name: "execution".to_string(),
        error: Some(message.to_string()),
        ..Default::default()
    }];
    sqlx::query(
        "UPDATE submissions SET status = $2, results = $3 WHERE id = $1 AND status IN ($4, $5)",
    )
    .bind(submission_id)
    .bind(SubmissionStatus::Error.as_str())
    .bind(Json(results))
    .bind(SubmissionStatus::Pending.as_str())
    .bind(SubmissionStatus::Running.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

async fn transition(
    pool: &PgPool,
    submission_id: Uuid,
    from: SubmissionStatus,
    to: SubmissionStatus,
) -> Result<(), AppError> {
    if !from.can_transition_to(to) {
        return Err(AppError::Internal(anyhow::anyhow!(
            "illegal submission transition {} -> {}",
            from.as_str(),
            to.as_str()
        )));
    }
    let updated = sqlx::query("UPDATE submissions SET status = $3 WHERE id = $1 AND status = $2")
        .bind(submission_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(pool)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(AppError::Conflict(format!(
            "Submission {submission_id} is no longer {}",
            from.as_str()
        )));
    }
    Ok(())
}

/// Finalizes a `Running` submission with the adapter's verdict.
pub async fn finalize(
    pool: &PgPool,
    submission_id: Uuid,
    results: Vec<TestResult>,
    all_passed: bool,
    execution_time_ms: Option<f64>,
) -> Result<SubmissionRow, AppError> {
    let status = SubmissionStatus::from_verdict(all_passed);
    let mut tx = pool.begin().await?;

    let submission = sqlx::query_as::<_, SubmissionRow>(
        r#"
        UPDATE submissions
        SET status = $2, results = $3, execution_time_ms = $4
        WHERE id = $1 AND status = $5
        RETURNING *
        "#,
    )
    .bind(submission_id)
    .bind(status.as_str())
    .bind(Json(results))
    .bind(execution_time_ms)
    .bind(SubmissionStatus::Running.as_str())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Submission {submission_id} is not running")))?;

    let submission = apply_verdict(&mut tx, submission, status).await?;
    tx.commit().await?;
    Ok(submission)
}

/// Counter increment plus, on a pass, the at-most-once badge award.
async fn apply_verdict(
    tx: &mut Transaction<'_, Postgres>,
    submission: SubmissionRow,
    status: SubmissionStatus,
) -> Result<SubmissionRow, AppError> {
    let passed = status == SubmissionStatus::Passed;
    let stats = record_attempt(&mut **tx, submission.challenge_id, passed).await?;

    info!(
        "Submission {} for challenge {} finalized as {} ({} attempts, {} passes)",
        submission.id,
        submission.challenge_id,
        status.as_str(),
        stats.total_attempts,
        stats.total_passes
    );

    if !passed {
        return Ok(submission);
    }

    let Some(awarded_at) =
        award_badge(&mut **tx, submission.user_id, submission.challenge_id, submission.id).await?
    else {
        return Ok(submission);
    };

    info!(
        "Badge for challenge {} awarded to user {}",
        submission.challenge_id, submission.user_id
    );

    Ok(sqlx::query_as::<_, SubmissionRow>(
        r#"
        UPDATE submissions
        SET badge_awarded = TRUE, badge_awarded_at = $2
        WHERE id = $1 AND badge_awarded = FALSE
        RETURNING *
        "#,
    )
    .bind(submission.id)
    .bind(awarded_at)
    .fetch_one(&mut **tx)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{live_pool, seed_challenge, seed_student};

    #[test]
    fn test_name_results_fills_blank_names_only() {
        let named = name_results(vec![
            TestResult {
                passed: true,
                ..Default::default()
            },
            TestResult {
                test_name: "edge".into(),
                ..Default::default()
            },
        ]);
        assert_eq!(named[0].test_name, "Test 1");
        assert_eq!(named[1].test_name, "edge");
    }

    async fn seed_user_and_challenge(pool: &PgPool) -> (Uuid, Uuid) {
        let user_id = seed_student(pool).await;
        let (challenge_id, _) = seed_challenge(pool, "python").await;
        (user_id, challenge_id)
    }

    #[tokio::test]
    async fn test_second_passing_submission_gets_no_badge() {
        let Some(pool) = live_pool().await else {
            return;
        };
        let (user_id, challenge_id) = seed_user_and_challenge(&pool).await;
        let passing = || {
            vec![TestResult {
                passed: true,
                ..Default::default()
            }]
        };
        let new = || NewSubmission {
            user_id,
            challenge_id,
            code: "def two_fer(): ...",
            language: "python",
        };

        let first = record_client_verdict(&pool, new(), passing(), true, Some(12.0))
            .await
            .unwrap();
        assert_eq!(first.status, "Passed");
        assert!(first.badge_awarded);
        assert!(first.badge_awarded_at.is_some());

        let second = record_client_verdict(&pool, new(), passing(), true, Some(9.0))
            .await
            .unwrap();
        assert_eq!(second.status, "Passed");
        assert!(!second.badge_awarded);

        let badges: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_badges WHERE user_id = $1 AND challenge_id = $2",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(badges, 1);

        let (attempts, passes): (i64, i64) = sqlx::query_as(
            "SELECT total_attempts, total_passes FROM challenges WHERE id = $1",
        )
        .bind(challenge_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!((attempts, passes), (2, 2));
    }

    #[tokio::test]
    async fn test_status_follows_flag_not_results() {
        let Some(pool) = live_pool().await else {
            return;
        };
        let (user_id, challenge_id) = seed_user_and_challenge(&pool).await;
        let all_green = vec![TestResult {
            passed: true,
            ..Default::default()
        }];
        let row = record_client_verdict(
            &pool,
            NewSubmission {
                user_id,
                challenge_id,
                code: "x",
                language: "python",
            },
            all_green,
            false,
            None,
        )
        .await
        .unwrap();
        assert_eq!(row.status, "Failed");
        assert!(!row.badge_awarded);
    }

    #[tokio::test]
    async fn test_server_side_lifecycle() {
        let Some(pool) = live_pool().await else {
            return;
        };
        let (user_id, challenge_id) = seed_user_and_challenge(&pool).await;
        let pending = create_pending(
            &pool,
            NewSubmission {
                user_id,
                challenge_id,
                code: "x",
                language: "python",
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.status, "Pending");

        // Finalizing before Running is rejected.
        assert!(finalize(&pool, pending.id, vec![], true, None).await.is_err());

        mark_running(&pool, pending.id).await.unwrap();
        let done = finalize(&pool, pending.id, vec![], true, Some(3.0))
            .await
            .unwrap();
        assert_eq!(done.status, "Passed");
        assert!(done.badge_awarded);
    }

    #[tokio::test]
    async fn test_error_leaves_counters_and_badges_alone() {
        let Some(pool) = live_pool().await else {
            return;
        };
        let (user_id, challenge_id) = seed_user_and_challenge(&pool).await;
        let pending = create_pending(
            &pool,
            NewSubmission {
                user_id,
                challenge_id,
                code: "x",
                language: "cobol",
            },
        )
        .await
        .unwrap();
        mark_running(&pool, pending.id).await.unwrap();
        mark_error(&pool, pending.id, "Unsupported language: cobol")
            .await
            .unwrap();

        let row = sqlx::query_as::<_, SubmissionRow>("SELECT * FROM submissions WHERE id = $1")
            .bind(pending.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.status, "Error");
        assert!(!row.badge_awarded);

        let (attempts, passes): (i64, i64) = sqlx::query_as(
            "SELECT total_attempts, total_passes FROM challenges WHERE id = $1",
        )
        .bind(challenge_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!((attempts, passes), (0, 0));

        let badges: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_badges WHERE user_id = $1 AND challenge_id = $2",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(badges, 0);

        // A terminal Error row cannot be finalized afterwards.
        assert!(finalize(&pool, pending.id, vec![], true, None).await.is_err());
    }
}
