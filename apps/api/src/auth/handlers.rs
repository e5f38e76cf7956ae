use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    hash_password, sign_token, validate_email, validate_password, validate_username,
    verify_password, AuthUser, PrincipalKind,
};
use crate::challenges::badges::list_badges;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::extractors::AppJson;
use crate::models::user::{Badge, Recruiter, User};
use crate::response::ApiResponse;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub university: Option<String>,
    pub graduation_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRecruiterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub company: String,
    pub position: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse<T: Serialize> {
    pub token: String,
    pub kind: PrincipalKind,
    pub account: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub university: Option<String>,
    pub graduation_year: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub location: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub badges: Vec<Badge>,
}

fn require_field(value: &str, name: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} is required")));
    }
    Ok(())
}

/// Lower-cased, de-duplicated, blank entries dropped.
pub fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim().to_lowercase();
        if !skill.is_empty() && !out.contains(&skill) {
            out.push(skill);
        }
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Students
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/auth/register
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn handle_register_student(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterStudentRequest>,
) -> Result<ApiResponse<AuthResponse<User>>, AppError> {
    validate_email(&req.email).map_err(AppError::Validation)?;
    validate_username(req.username.trim()).map_err(AppError::Validation)?;
    validate_password(&req.password).map_err(AppError::Validation)?;
    require_field(&req.full_name, "fullName")?;

    let password_hash = hash_password(&req.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, username, password_hash, full_name, university, graduation_year)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.email.trim().to_lowercase())
    .bind(req.username.trim())
    .bind(&password_hash)
    .bind(req.full_name.trim())
    .bind(req.university.as_deref().map(str::trim))
    .bind(req.graduation_year)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Email or username is already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Registered student {}", user.id);

    let token = sign_token(
        user.id,
        PrincipalKind::Student,
        user.is_admin,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    Ok(ApiResponse::created(AuthResponse {
        token,
        kind: PrincipalKind::Student,
        account: user,
    })
    .with_message("Registration successful"))
}

/// POST /api/v1/auth/login
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn handle_login_student(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<ApiResponse<AuthResponse<User>>, AppError> {
    require_field(&req.email, "email")?;
    require_field(&req.password, "password")?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(req.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .filter(|u| verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = sign_token(
        user.id,
        PrincipalKind::Student,
        user.is_admin,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    Ok(ApiResponse::ok(AuthResponse {
        token,
        kind: PrincipalKind::Student,
        account: user,
    }))
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<MeResponse>, AppError> {
    let user_id = auth.require_student()?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account no longer exists".to_string()))?;
    let badges = list_badges(&state.db, user_id).await?;
    Ok(ApiResponse::ok(MeResponse { user, badges }))
}

/// PUT /api/v1/auth/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let user_id = auth.require_student()?;

    if let Some(name) = &req.full_name {
        require_field(name, "fullName")?;
    }
    if let Some(year) = req.graduation_year {
        if !(1950..=2100).contains(&year) {
            return Err(AppError::Validation(format!(
                "graduationYear {year} is out of range"
            )));
        }
    }
    let skills = req.skills.map(normalize_skills);

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            full_name       = COALESCE($2, full_name),
            bio             = COALESCE($3, bio),
            university      = COALESCE($4, university),
            graduation_year = COALESCE($5, graduation_year),
            skills          = COALESCE($6, skills),
            location        = COALESCE($7, location),
            is_public       = COALESCE($8, is_public)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(req.full_name.as_deref().map(str::trim))
    .bind(req.bio)
    .bind(req.university)
    .bind(req.graduation_year)
    .bind(skills)
    .bind(req.location)
    .bind(req.is_public)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Account no longer exists".to_string()))?;

    Ok(ApiResponse::ok(user).with_message("Profile updated"))
}

/// GET /api/v1/auth/badges
pub async fn handle_my_badges(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<Badge>>, AppError> {
    let user_id = auth.require_student()?;
    Ok(ApiResponse::ok(list_badges(&state.db, user_id).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Recruiters
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/recruiters/register
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn handle_register_recruiter(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRecruiterRequest>,
) -> Result<ApiResponse<AuthResponse<Recruiter>>, AppError> {
    validate_email(&req.email).map_err(AppError::Validation)?;
    validate_password(&req.password).map_err(AppError::Validation)?;
    require_field(&req.full_name, "fullName")?;
    require_field(&req.company, "company")?;

    let password_hash = hash_password(&req.password)?;

    let recruiter = sqlx::query_as::<_, Recruiter>(
        r#"
        INSERT INTO recruiters (id, email, password_hash, full_name, company, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.email.trim().to_lowercase())
    .bind(&password_hash)
    .bind(req.full_name.trim())
    .bind(req.company.trim())
    .bind(req.position.as_deref().map(str::trim))
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Email is already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Registered recruiter {} ({})", recruiter.id, recruiter.company);

    let token = sign_token(
        recruiter.id,
        PrincipalKind::Recruiter,
        false,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    Ok(ApiResponse::created(AuthResponse {
        token,
        kind: PrincipalKind::Recruiter,
        account: recruiter,
    })
    .with_message("Registration successful"))
}

/// POST /api/v1/recruiters/login
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn handle_login_recruiter(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<ApiResponse<AuthResponse<Recruiter>>, AppError> {
    require_field(&req.email, "email")?;
    require_field(&req.password, "password")?;

    let recruiter = sqlx::query_as::<_, Recruiter>("SELECT * FROM recruiters WHERE email = $1")
        .bind(req.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .filter(|r| verify_password(&req.password, &r.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = sign_token(
        recruiter.id,
        PrincipalKind::Recruiter,
        false,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    Ok(ApiResponse::ok(AuthResponse {
        token,
        kind: PrincipalKind::Recruiter,
        account: recruiter,
    }))
}

/// GET /api/v1/recruiters/me
pub async fn handle_recruiter_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Recruiter>, AppError> {
    let recruiter_id = auth.require_recruiter()?;
    let recruiter = sqlx::query_as::<_, Recruiter>("SELECT * FROM recruiters WHERE id = $1")
        .bind(recruiter_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account no longer exists".to_string()))?;
    Ok(ApiResponse::ok(recruiter))
}
