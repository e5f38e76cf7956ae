use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{ensure_owner, AuthUser};
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::extractors::AppJson;
use crate::models::project::ProjectRow;
use crate::projects::github::parse_repo_url;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub repo_url: String,
}

/// POST /api/v1/projects
///
/// GitHub metadata is pulled once here and never refreshed.
pub async fn handle_create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> Result<ApiResponse<ProjectRow>, AppError> {
    let user_id = auth.require_student()?;
    if req.repo_url.trim().is_empty() {
        return Err(AppError::Validation("repoUrl is required".to_string()));
    }
    let (owner, repo) = parse_repo_url(&req.repo_url)?;
    let canonical_url = format!("https://github.com/{owner}/{repo}");

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM projects WHERE user_id = $1 AND lower(repo_url) = lower($2))",
    )
    .bind(user_id)
    .bind(&canonical_url)
    .fetch_one(&state.db)
    .await?;
    if exists {
        return Err(AppError::Conflict(format!("{owner}/{repo} is already registered")));
    }

    let meta = state.github.fetch_repo(&owner, &repo).await?;

    let project = sqlx::query_as::<_, ProjectRow>(
        r#"
        INSERT INTO projects
            (id, user_id, repo_url, name, description, stars, forks, primary_language, topics)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&canonical_url)
    .bind(&meta.name)
    .bind(&meta.description)
    .bind(meta.stargazers_count)
    .bind(meta.forks_count)
    .bind(&meta.language)
    .bind(&meta.topics)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("{owner}/{repo} is already registered"))
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Registered project {} for user {user_id}", meta.full_name);
    Ok(ApiResponse::created(project))
}

/// GET /api/v1/projects
pub async fn handle_list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<ProjectRow>>, AppError> {
    let user_id = auth.require_student()?;
    Ok(ApiResponse::ok(list_projects(&state.db, user_id).await?))
}

/// DELETE /api/v1/projects/:id
pub async fn handle_delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    let user_id = auth.require_student()?;
    let owner: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    ensure_owner(owner, user_id, &format!("Project {id}"))?;

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    Ok(ApiResponse::message("Project deleted"))
}

pub async fn list_projects(
    pool: &sqlx::PgPool,
    user_id: Uuid,
) -> Result<Vec<ProjectRow>, sqlx::Error> {
    sqlx::query_as::<_, ProjectRow>(
        "SELECT * FROM projects WHERE user_id = $1 ORDER BY stars DESC, created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
