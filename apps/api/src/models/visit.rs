use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Anonymous,
    Student,
    Recruiter,
}

impl ViewerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Student => "student",
            Self::Recruiter => "recruiter",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VisitRow {
    pub id: Uuid,
    pub profile_user_id: Uuid,
    pub viewer_role: String,
    pub viewer_id: Option<Uuid>,
    pub location: Option<String>,
    pub visited_at: DateTime<Utc>,
}
