use axum::extract::State;
use serde::Serialize;
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use crate::admin::insert_challenge;
use crate::auth::AuthUser;
use crate::challenges::catalog::{builtin_challenges, ChallengeDefinition};
use crate::errors::AppError;
use crate::extractors::AppJson;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChallengeResponse {
    pub slug: String,
    pub id: Option<Uuid>,
    pub created: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResponse {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub users: i64,
    pub recruiters: i64,
    pub documents: i64,
    pub submissions: i64,
    pub badges: i64,
}

/// POST /api/v1/admin/challenges
///
/// A duplicate slug is reported as `created: false` rather than an error.
pub async fn handle_create_challenge(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(def): AppJson<ChallengeDefinition>,
) -> Result<ApiResponse<CreateChallengeResponse>, AppError> {
    auth.require_admin()?;
    def.validate().map_err(AppError::Validation)?;

    let id = insert_challenge(&state.db, &def).await?;
    let created = id.is_some();
    if created {
        info!("Challenge '{}' created", def.slug);
    }

    let response = CreateChallengeResponse {
        slug: def.slug,
        id,
        created,
    };
    Ok(if created {
        ApiResponse::created(response)
    } else {
        ApiResponse::ok(response).with_message("Challenge already exists")
    })
}

/// POST /api/v1/admin/challenges/seed
pub async fn handle_seed_challenges(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<SeedResponse>, AppError> {
    auth.require_admin()?;

    let mut tx = state.db.begin().await?;
    let mut inserted = Vec::new();
    let mut skipped = Vec::new();
    for def in builtin_challenges() {
        match insert_challenge(&mut *tx, &def).await? {
            Some(_) => inserted.push(def.slug),
            None => skipped.push(def.slug),
        }
    }
    tx.commit().await?;

    info!(
        "Seeded challenges: {} inserted, {} already present",
        inserted.len(),
        skipped.len()
    );
    Ok(ApiResponse::ok(SeedResponse { inserted, skipped }))
}

/// GET /api/v1/admin/stats
pub async fn handle_platform_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<PlatformStats>, AppError> {
    auth.require_admin()?;
    let stats = sqlx::query_as::<_, PlatformStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users)       AS users,
            (SELECT COUNT(*) FROM recruiters)  AS recruiters,
            (SELECT COUNT(*) FROM documents)   AS documents,
            (SELECT COUNT(*) FROM submissions) AS submissions,
            (SELECT COUNT(*) FROM user_badges) AS badges
        "#,
    )
    .fetch_one(&state.db)
    .await?;
    Ok(ApiResponse::ok(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_body_parses() {
        let body = r#"{
            "slug": "fizz-buzz",
            "title": "Fizz Buzz",
            "description": "classic",
            "difficulty": "easy",
            "language": "python",
            "testCases": [{"name": "three", "input": "3", "expectedOutput": "Fizz"}]
        }"#;
        let def: ChallengeDefinition = serde_json::from_str(body).unwrap();
        assert!(def.validate().is_ok());
        assert!(!def.test_cases[0].hidden);
        assert!(def.starter_code.is_empty());
    }
}
