//! Coding challenges: definitions, attempt statistics, submissions and badges.

pub mod badges;
pub mod catalog;
pub mod handlers;
pub mod stats;
pub mod submission;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::challenge::ChallengeRow;

/// Looks a challenge up by slug, falling back to its UUID.
pub async fn find_challenge(pool: &PgPool, key: &str) -> Result<Option<ChallengeRow>, sqlx::Error> {
    let key = key.trim();
    let by_slug = sqlx::query_as::<_, ChallengeRow>("SELECT * FROM challenges WHERE slug = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    if by_slug.is_some() {
        return Ok(by_slug);
    }

    match Uuid::parse_str(key) {
        Ok(id) => {
            sqlx::query_as::<_, ChallengeRow>("SELECT * FROM challenges WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await
        }
        Err(_) => Ok(None),
    }
}
