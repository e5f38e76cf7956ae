use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applications::{count_by_status, validate_required};
use crate::auth::{ensure_owner, AuthUser};
use crate::errors::AppError;
use crate::extractors::AppJson;
use crate::models::application::{ApplicationStatus, JobApplicationRow};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    pub status: Option<ApplicationStatus>,
    pub job_url: Option<String>,
    pub notes: Option<String>,
    pub applied_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub job_url: Option<String>,
    pub notes: Option<String>,
    pub applied_on: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationList {
    pub applications: Vec<JobApplicationRow>,
    pub counts: BTreeMap<String, i64>,
}

/// POST /api/v1/applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<CreateApplicationRequest>,
) -> Result<ApiResponse<JobApplicationRow>, AppError> {
    let user_id = auth.require_student()?;
    validate_required("company", &req.company).map_err(AppError::Validation)?;
    validate_required("position", &req.position).map_err(AppError::Validation)?;

    let row = sqlx::query_as::<_, JobApplicationRow>(
        r#"
        INSERT INTO job_applications
            (id, user_id, company, position, status, job_url, notes, applied_on)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(req.company.trim())
    .bind(req.position.trim())
    .bind(req.status.unwrap_or(ApplicationStatus::Applied).as_str())
    .bind(req.job_url.as_deref().map(str::trim))
    .bind(req.notes.as_deref())
    .bind(req.applied_on)
    .fetch_one(&state.db)
    .await?;
    Ok(ApiResponse::created(row))
}

/// GET /api/v1/applications
///
/// Counts always cover every application, independent of the `status` filter.
pub async fn handle_list_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ApplicationListQuery>,
) -> Result<ApiResponse<ApplicationList>, AppError> {
    let user_id = auth.require_student()?;
    let all = sqlx::query_as::<_, JobApplicationRow>(
        "SELECT * FROM job_applications WHERE user_id = $1 ORDER BY updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    let counts = count_by_status(all.iter().map(|a| a.status.as_str()));
    let applications = match query.status {
        Some(status) => all
            .into_iter()
            .filter(|a| a.status == status.as_str())
            .collect(),
        None => all,
    };
    Ok(ApiResponse::ok(ApplicationList {
        applications,
        counts,
    }))
}

async fn fetch_application(
    state: &AppState,
    id: Uuid,
) -> Result<Option<JobApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, JobApplicationRow>("SELECT * FROM job_applications WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<JobApplicationRow>, AppError> {
    let user_id = auth.require_student()?;
    let row = fetch_application(&state, id).await?;
    ensure_owner(row.as_ref().map(|r| r.user_id), user_id, &format!("Application {id}"))?;
    row.map(ApiResponse::ok)
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// PATCH /api/v1/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateApplicationRequest>,
) -> Result<ApiResponse<JobApplicationRow>, AppError> {
    let user_id = auth.require_student()?;
    let existing = fetch_application(&state, id).await?;
    ensure_owner(existing.map(|r| r.user_id), user_id, &format!("Application {id}"))?;

    if let Some(company) = &req.company {
        validate_required("company", company).map_err(AppError::Validation)?;
    }
    if let Some(position) = &req.position {
        validate_required("position", position).map_err(AppError::Validation)?;
    }

    let row = sqlx::query_as::<_, JobApplicationRow>(
        r#"
        UPDATE job_applications SET
            company    = COALESCE($2, company),
            position   = COALESCE($3, position),
            status     = COALESCE($4, status),
            job_url    = COALESCE($5, job_url),
            notes      = COALESCE($6, notes),
            applied_on = COALESCE($7, applied_on),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.company.as_deref().map(str::trim))
    .bind(req.position.as_deref().map(str::trim))
    .bind(req.status.map(|s| s.as_str()))
    .bind(req.job_url.as_deref().map(str::trim))
    .bind(req.notes.as_deref())
    .bind(req.applied_on)
    .fetch_one(&state.db)
    .await?;
    Ok(ApiResponse::ok(row))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    let user_id = auth.require_student()?;
    let existing = fetch_application(&state, id).await?;
    ensure_owner(existing.map(|r| r.user_id), user_id, &format!("Application {id}"))?;

    sqlx::query("DELETE FROM job_applications WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    Ok(ApiResponse::message("Application deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_body_defaults() {
        let req: CreateApplicationRequest =
            serde_json::from_str(r#"{"company":"Acme","position":"Intern","appliedOn":"2024-03-01"}"#)
                .unwrap();
        assert!(req.status.is_none());
        assert_eq!(req.applied_on, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let parsed: Result<UpdateApplicationRequest, _> =
            serde_json::from_str(r#"{"status":"ghosted"}"#);
        assert!(parsed.is_err());
    }
}
