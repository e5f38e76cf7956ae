use axum::extract::{Query, State};
use chrono::Utc;
use serde::Deserialize;

use crate::analytics::{clamp_days, summarize, AnalyticsSummary};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::visit::VisitRow;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<u32>,
}

/// GET /api/v1/analytics/summary
pub async fn handle_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SummaryQuery>,
) -> Result<ApiResponse<AnalyticsSummary>, AppError> {
    let user_id = auth.require_student()?;
    let visits = sqlx::query_as::<_, VisitRow>(
        "SELECT * FROM visits WHERE profile_user_id = $1 ORDER BY visited_at ASC",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(summarize(
        &visits,
        Utc::now(),
        clamp_days(query.days),
    )))
}
