use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::PublicProfile;
use crate::response::ApiResponse;
use crate::scout::{SearchFilters, SearchQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub results: Vec<PublicProfile>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub bookmarked_at: DateTime<Utc>,
}

const SEARCH_WHERE: &str = r#"
    WHERE is_public
      AND ($1::text IS NULL OR full_name ILIKE $1 OR username ILIKE $1 OR bio ILIKE $1)
      AND ($2::text[] IS NULL OR skills @> $2)
      AND ($3::text IS NULL OR university ILIKE $3)
      AND ($4::int IS NULL OR graduation_year = $4)
      AND ($5::text IS NULL OR location ILIKE $5)
"#;

/// GET /api/v1/scout/search
pub async fn handle_search(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<ApiResponse<SearchPage>, AppError> {
    auth.require_recruiter()?;
    let filters = SearchFilters::from(query);

    let count_sql = format!("SELECT COUNT(*) FROM users {SEARCH_WHERE}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(&filters.text_pattern)
        .bind(&filters.skills)
        .bind(&filters.university_pattern)
        .bind(filters.graduation_year)
        .bind(&filters.location_pattern)
        .fetch_one(&state.db)
        .await?;

    let page_sql = format!(
        "SELECT id, username, full_name, bio, university, graduation_year, skills, location \
         FROM users {SEARCH_WHERE} ORDER BY full_name ASC, id ASC LIMIT $6 OFFSET $7"
    );
    let results = sqlx::query_as::<_, PublicProfile>(&page_sql)
        .bind(&filters.text_pattern)
        .bind(&filters.skills)
        .bind(&filters.university_pattern)
        .bind(filters.graduation_year)
        .bind(&filters.location_pattern)
        .bind(filters.per_page)
        .bind(filters.offset())
        .fetch_all(&state.db)
        .await?;

    Ok(ApiResponse::ok(SearchPage {
        results,
        total,
        page: filters.page,
        per_page: filters.per_page,
    }))
}

/// POST /api/v1/recruiters/bookmarks/:user_id
///
/// Idempotent: bookmarking the same student twice keeps a single row.
pub async fn handle_add_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    let recruiter_id = auth.require_recruiter()?;

    let visible: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_public)")
            .bind(user_id)
            .fetch_one(&state.db)
            .await?;
    if !visible {
        return Err(AppError::NotFound(format!("Student {user_id} not found")));
    }

    let inserted = sqlx::query(
        "INSERT INTO recruiter_bookmarks (recruiter_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(recruiter_id)
    .bind(user_id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if inserted > 0 {
        info!("Recruiter {recruiter_id} bookmarked {user_id}");
    }
    Ok(ApiResponse::message("Bookmarked"))
}

/// DELETE /api/v1/recruiters/bookmarks/:user_id
pub async fn handle_remove_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    let recruiter_id = auth.require_recruiter()?;
    let removed = sqlx::query("DELETE FROM recruiter_bookmarks WHERE recruiter_id = $1 AND user_id = $2")
        .bind(recruiter_id)
        .bind(user_id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if removed == 0 {
        return Err(AppError::NotFound(format!("No bookmark for {user_id}")));
    }
    Ok(ApiResponse::message("Bookmark removed"))
}

/// GET /api/v1/recruiters/bookmarks
pub async fn handle_list_bookmarks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<BookmarkedProfile>>, AppError> {
    let recruiter_id = auth.require_recruiter()?;
    let rows = sqlx::query_as::<_, BookmarkedProfile>(
        r#"
        SELECT u.id, u.username, u.full_name, u.bio, u.university, u.graduation_year,
               u.skills, u.location, b.created_at AS bookmarked_at
        FROM recruiter_bookmarks b
        JOIN users u ON u.id = b.user_id
        WHERE b.recruiter_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(recruiter_id)
    .fetch_all(&state.db)
    .await?;
    Ok(ApiResponse::ok(rows))
}
