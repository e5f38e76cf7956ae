use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::user::Badge;

/// Awards the (user, challenge) badge with one conditional INSERT.
///
/// Returns the award time when this call created the badge, `None` when the user
/// already held it. The `(user_id, challenge_id)` primary key makes concurrent
/// passing submissions race-free: exactly one insert wins.
pub async fn award_badge<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    challenge_id: Uuid,
    submission_id: Uuid,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO user_badges (user_id, challenge_id, submission_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, challenge_id) DO NOTHING
        RETURNING awarded_at
        "#,
    )
    .bind(user_id)
    .bind(challenge_id)
    .bind(submission_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_badges(pool: &PgPool, user_id: Uuid) -> Result<Vec<Badge>, sqlx::Error> {
    sqlx::query_as::<_, Badge>(
        r#"
        SELECT b.challenge_id, b.submission_id, c.slug AS challenge_slug,
               c.title AS challenge_title, b.awarded_at
        FROM user_badges b
        JOIN challenges c ON c.id = b.challenge_id
        WHERE b.user_id = $1
        ORDER BY b.awarded_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
