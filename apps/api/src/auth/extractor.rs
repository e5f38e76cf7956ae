use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::{verify_token, PrincipalKind};
use crate::errors::AppError;
use crate::models::visit::ViewerRole;
use crate::state::AppState;

/// Authenticated principal taken from the `Authorization: Bearer <token>` header.
///
/// Use `Option<AuthUser>` for endpoints that also serve anonymous callers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub admin: bool,
}

impl AuthUser {
    pub fn require_student(&self) -> Result<Uuid, AppError> {
        match self.kind {
            PrincipalKind::Student => Ok(self.id),
            PrincipalKind::Recruiter => Err(AppError::Forbidden),
        }
    }

    pub fn require_recruiter(&self) -> Result<Uuid, AppError> {
        match self.kind {
            PrincipalKind::Recruiter => Ok(self.id),
            PrincipalKind::Student => Err(AppError::Forbidden),
        }
    }

    pub fn require_admin(&self) -> Result<Uuid, AppError> {
        if self.admin {
            Ok(self.id)
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn viewer_role(&self) -> ViewerRole {
        match self.kind {
            PrincipalKind::Student => ViewerRole::Student,
            PrincipalKind::Recruiter => ViewerRole::Recruiter,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".to_string()))?;

        let claims = verify_token(token.trim(), &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            id: claims.sub,
            kind: claims.kind,
            admin: claims.admin,
        })
    }
}
