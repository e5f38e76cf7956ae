use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

/// Attempt counters for one challenge. `success_rate` is derived on read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeStats {
    pub total_attempts: i64,
    pub total_passes: i64,
    pub success_rate: f64,
}

impl ChallengeStats {
    pub fn new(total_attempts: i64, total_passes: i64) -> Self {
        Self {
            total_attempts,
            total_passes,
            success_rate: success_rate(total_attempts, total_passes),
        }
    }
}

/// passes / attempts, or 0 when nothing has been attempted yet.
pub fn success_rate(total_attempts: i64, total_passes: i64) -> f64 {
    if total_attempts <= 0 {
        return 0.0;
    }
    total_passes as f64 / total_attempts as f64
}

/// Counter deltas for one attempt: attempts always +1, passes +1 only when passed.
pub fn attempt_increments(passed: bool) -> (i64, i64) {
    (1, if passed { 1 } else { 0 })
}

/// Records one attempt with a single atomic UPDATE (no read-modify-write).
pub async fn record_attempt<'e>(
    executor: impl PgExecutor<'e>,
    challenge_id: Uuid,
    passed: bool,
) -> Result<ChallengeStats, sqlx::Error> {
    let (attempts, passes) = attempt_increments(passed);
    let (total_attempts, total_passes): (i64, i64) = sqlx::query_as(
        r#"
        UPDATE challenges
        SET total_attempts = total_attempts + $2,
            total_passes   = total_passes + $3
        WHERE id = $1
        RETURNING total_attempts, total_passes
        "#,
    )
    .bind(challenge_id)
    .bind(attempts)
    .bind(passes)
    .fetch_one(executor)
    .await?;

    Ok(ChallengeStats::new(total_attempts, total_passes))
}
