//! Admin-only endpoints: challenge authoring and platform counters.

pub mod handlers;

use sqlx::types::Json;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::challenges::catalog::ChallengeDefinition;

/// Inserts a challenge unless the slug is taken. Returns the new id, or `None`
/// when a challenge with that slug already exists.
pub async fn insert_challenge<'e>(
    executor: impl PgExecutor<'e>,
    def: &ChallengeDefinition,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO challenges
            (id, slug, title, description, difficulty, language, starter_code, test_cases)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (slug) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&def.slug)
    .bind(def.title.trim())
    .bind(&def.description)
    .bind(def.difficulty.as_str())
    .bind(def.language.as_str())
    .bind(&def.starter_code)
    .bind(Json(&def.test_cases))
    .fetch_optional(executor)
    .await
}
