use axum::extract::{Path, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::challenges::badges::list_badges;
use crate::documents::storage::presign_get;
use crate::errors::AppError;
use crate::extractors::AppJson;
use crate::models::document::{DocumentRow, Visibility};
use crate::models::project::ProjectRow;
use crate::models::user::{Badge, PublicProfile, User};
use crate::models::visit::ViewerRole;
use crate::portfolio::{
    clamp_share_ttl, generate_share_token, is_well_formed_token, normalize_location, share_key,
    should_record_visit,
};
use crate::projects::handlers::list_projects;
use crate::response::ApiResponse;
use crate::state::AppState;

pub const VISITOR_LOCATION_HEADER: &str = "x-visitor-location";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDocument {
    #[serde(flatten)]
    pub document: DocumentRow,
    pub url: String,
    pub url_expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    pub profile: PublicProfile,
    pub documents: Vec<PortfolioDocument>,
    pub projects: Vec<ProjectRow>,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

async fn assemble(
    state: &AppState,
    user: &User,
    include_private: bool,
) -> Result<PortfolioView, AppError> {
    let documents = sqlx::query_as::<_, DocumentRow>(
        r#"
        SELECT * FROM documents
        WHERE user_id = $1 AND ($2 OR visibility = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.id)
    .bind(include_private)
    .bind(Visibility::Public.as_str())
    .fetch_all(&state.db)
    .await?;

    let mut signed = Vec::with_capacity(documents.len());
    for document in documents {
        let link = presign_get(
            &state.s3,
            &state.config.s3_bucket,
            &document.s3_key,
            state.config.signed_url_ttl_secs,
        )
        .await?;
        signed.push(PortfolioDocument {
            document,
            url: link.url,
            url_expires_at: link.expires_at,
        });
    }

    Ok(PortfolioView {
        profile: PublicProfile::from(user),
        documents: signed,
        projects: list_projects(&state.db, user.id).await?,
        badges: list_badges(&state.db, user.id).await?,
    })
}

async fn record_visit(
    state: &AppState,
    profile_user_id: Uuid,
    viewer: Option<&AuthUser>,
    location: Option<String>,
) -> Result<(), AppError> {
    let role = viewer.map(AuthUser::viewer_role).unwrap_or(ViewerRole::Anonymous);
    sqlx::query(
        "INSERT INTO visits (id, profile_user_id, viewer_role, viewer_id, location) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(profile_user_id)
    .bind(role.as_str())
    .bind(viewer.map(|v| v.id))
    .bind(location)
    .execute(&state.db)
    .await?;
    Ok(())
}

/// GET /api/v1/portfolio/:username
pub async fn handle_get_portfolio(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
    auth: Option<AuthUser>,
) -> Result<ApiResponse<PortfolioView>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(username) = lower($1)")
        .bind(username.trim())
        .fetch_optional(&state.db)
        .await?;

    let viewer_id = auth.as_ref().map(|a| a.id);
    let user = match user {
        Some(u) if u.is_public || viewer_id == Some(u.id) => u,
        _ => return Err(AppError::NotFound(format!("Portfolio {username} not found"))),
    };

    let view = assemble(&state, &user, false).await?;

    if should_record_visit(user.id, viewer_id) {
        let location = normalize_location(
            headers
                .get(VISITOR_LOCATION_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        // A lost visit must not fail the page view.
        if let Err(e) = record_visit(&state, user.id, auth.as_ref(), location).await {
            warn!("Failed to record visit for {}: {e}", user.id);
        }
    }

    Ok(ApiResponse::ok(view))
}

/// POST /api/v1/portfolio/share
pub async fn handle_create_share_link(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<AppJson<ShareRequest>>,
) -> Result<ApiResponse<ShareResponse>, AppError> {
    let user_id = auth.require_student()?;
    let req = body.map(|AppJson(r)| r).unwrap_or_default();
    let ttl = clamp_share_ttl(req.ttl_secs, state.config.share_link_max_ttl_secs);

    let token = generate_share_token();
    let mut conn = state.redis.get_multiplexed_async_connection().await?;
    redis::cmd("SET")
        .arg(share_key(&token))
        .arg(user_id.to_string())
        .arg("EX")
        .arg(ttl)
        .query_async::<_, ()>(&mut conn)
        .await?;

    info!("Issued share link for user {user_id} valid for {ttl}s");
    Ok(ApiResponse::created(ShareResponse {
        token,
        expires_at: Utc::now() + Duration::seconds(ttl as i64),
    }))
}

/// GET /api/v1/portfolio/shared/:token
///
/// Includes private documents. Visits through share links are not recorded.
pub async fn handle_get_shared_portfolio(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<ApiResponse<PortfolioView>, AppError> {
    let not_found = || AppError::NotFound("Share link not found or expired".to_string());
    if !is_well_formed_token(&token) {
        return Err(not_found());
    }

    let mut conn = state.redis.get_multiplexed_async_connection().await?;
    let owner: Option<String> = redis::cmd("GET")
        .arg(share_key(&token))
        .query_async(&mut conn)
        .await?;
    let owner = owner
        .and_then(|raw| Uuid::parse_str(&raw).ok())
        .ok_or_else(not_found)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(owner)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::ok(assemble(&state, &user, true).await?))
}
